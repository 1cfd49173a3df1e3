use {super::*, std::collections::HashMap};

/// One outgoing request, correlated to its eventual response by `id`.
pub(super) enum ActorMessage {
    Request {
        id: Id,
        method: String,
        params: Value,
        respond_to: oneshot::Sender<Result<Message>>,
    },
}

/// Owns the socket halves and drives the read/write loop. Spawned once per
/// successful `Client::connect`; exits (and wakes every pending request with
/// `ClientError::NotConnected`) on the first I/O error or EOF, leaving
/// reconnection to the caller (spec §4.7).
pub(super) struct Connection {
    requests: mpsc::Receiver<ActorMessage>,
    events: broadcast::Sender<Event>,
    pending: HashMap<Id, oneshot::Sender<Result<Message>>>,
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: BufWriter<tokio::net::tcp::OwnedWriteHalf>,
}

impl Connection {
    pub(super) fn new(stream: TcpStream, requests: mpsc::Receiver<ActorMessage>, events: broadcast::Sender<Event>) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            requests,
            events,
            pending: HashMap::new(),
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
        }
    }

    pub(super) async fn run(mut self) {
        let mut line = String::new();

        loop {
            line.clear();

            tokio::select! {
                message = self.requests.recv() => {
                    match message {
                        Some(ActorMessage::Request { id, method, params, respond_to }) => {
                            if self.send_request(id, method, params, respond_to).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                read = self.reader.read_line(&mut line) => {
                    match read {
                        Ok(0) => break,
                        Ok(_) => self.dispatch(line.trim_end()),
                        Err(error) => {
                            warn!("stratum read error: {error}");
                            break;
                        }
                    }
                }
            }
        }

        for (_, respond_to) in self.pending.drain() {
            let _ = respond_to.send(Err(ClientError::NotConnected));
        }
        let _ = self.events.send(Event::Disconnected);
    }

    async fn send_request(
        &mut self,
        id: Id,
        method: String,
        params: Value,
        respond_to: oneshot::Sender<Result<Message>>,
    ) -> std::result::Result<(), ()> {
        let request = Message::Request { id: id.clone(), method, params };

        let mut frame = match serde_json::to_string(&request) {
            Ok(frame) => frame,
            Err(source) => {
                let _ = respond_to.send(Err(ClientError::Serialization { source }));
                return Ok(());
            }
        };
        frame.push('\n');

        if let Err(source) = self.writer.write_all(frame.as_bytes()).await {
            let _ = respond_to.send(Err(ClientError::Io { source }));
            return Err(());
        }
        if let Err(source) = self.writer.flush().await {
            let _ = respond_to.send(Err(ClientError::Io { source }));
            return Err(());
        }

        self.pending.insert(id, respond_to);
        Ok(())
    }

    fn dispatch(&mut self, line: &str) {
        let message: Message = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(error) => {
                warn!("invalid stratum message {line:?}: {error}");
                return;
            }
        };

        match message {
            Message::Response { ref id, .. } => {
                if let Some(respond_to) = self.pending.remove(id) {
                    let _ = respond_to.send(Ok(message));
                } else {
                    warn!("unmatched stratum response id={id}");
                }
            }
            Message::Notification { method, params } => match method.as_str() {
                "mining.notify" => match serde_json::from_value::<Notify>(params) {
                    Ok(notify) => {
                        let _ = self.events.send(Event::Notify(notify));
                    }
                    Err(error) => warn!("malformed mining.notify: {error}"),
                },
                "mining.set_difficulty" => match serde_json::from_value::<SetDifficulty>(params) {
                    Ok(set_difficulty) => {
                        let _ = self.events.send(Event::SetDifficulty(set_difficulty.difficulty()));
                    }
                    Err(error) => warn!("malformed mining.set_difficulty: {error}"),
                },
                other => debug!("ignoring unknown stratum notification: {other}"),
            },
            Message::Request { method, .. } => debug!("ignoring pool-originated request: {method}"),
        }
    }
}
