use {
    super::*,
    connection::{ActorMessage, Connection},
    error::ClientError,
};

mod connection;
pub mod error;

pub type Result<T = (), E = ClientError> = std::result::Result<T, E>;

/// A live Stratum session: a thin handle around a `Connection` actor task
/// (spec §4.7). Cloning a `Client` is cheap — every clone shares the same
/// connection and the same broadcast of pool-pushed events.
#[derive(Clone)]
pub struct Client {
    requests: mpsc::Sender<ActorMessage>,
    events: broadcast::Sender<Event>,
    next_id: Arc<AtomicU64>,
}

impl Client {
    /// Resolves `host:port`, connects with a timeout, and spawns the
    /// connection actor. Returns as soon as the TCP handshake completes;
    /// `authorize` is a separate call, matching spec §4.7's two-step
    /// connect-then-authorize sequence.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ClientError::Timeout { timeout })?
            .map_err(|source| ClientError::Io { source })?;

        let (requests_tx, requests_rx) = mpsc::channel(32);
        let (events_tx, _) = broadcast::channel(32);

        let connection = Connection::new(stream, requests_rx, events_tx.clone());
        tokio::spawn(connection.run());

        Ok(Self {
            requests: requests_tx,
            events: events_tx,
            next_id: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Subscribes to `mining.notify`/`mining.set_difficulty` pushes. Each
    /// subscriber gets every event from the moment of subscription onward;
    /// lagging subscribers skip ahead rather than block the connection.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn call(&self, id: Id, method: &str, params: Value) -> Result<Message> {
        let (respond_to, response) = oneshot::channel();

        self.requests
            .send(ActorMessage::Request {
                id,
                method: method.into(),
                params,
                respond_to,
            })
            .await
            .map_err(|_| ClientError::NotConnected)?;

        response.await.map_err(|_| ClientError::NotConnected)?
    }

    /// Sends `mining.authorize`, always using the fixed id `"auth"` (spec §6).
    pub async fn authorize(&self, username: &str, password: &str) -> Result<bool> {
        let authorize = Authorize {
            username: username.into(),
            password: password.into(),
        };

        let response = self
            .call(
                Id::String("auth".into()),
                "mining.authorize",
                serde_json::to_value(authorize).expect("Authorize always serializes"),
            )
            .await?;

        accepted(response)
    }

    /// Sends `mining.submit` with a fresh, monotonically increasing integer id.
    pub async fn submit(&self, submit: Submit) -> Result<bool> {
        let id = Id::Number(self.next_id.fetch_add(1, Ordering::Relaxed));

        let response = self
            .call(
                id,
                "mining.submit",
                serde_json::to_value(submit).expect("Submit always serializes"),
            )
            .await?;

        accepted(response)
    }
}

fn accepted(message: Message) -> Result<bool> {
    match message {
        Message::Response { error: Some(error), .. } => Err(ClientError::Rpc { source: error }),
        Message::Response { result: Some(value), .. } => Ok(value.as_bool().unwrap_or(false)),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, tokio::net::TcpListener};

    async fn fake_pool() -> (Client, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = Client::connect("127.0.0.1", port, Duration::from_secs(1)).await.unwrap();
        (client, listener)
    }

    #[tokio::test]
    async fn authorize_uses_the_fixed_auth_id_and_reports_acceptance() {
        let (client, listener) = fake_pool().await;
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut writer = BufWriter::new(write_half);

        let call = tokio::spawn(async move { client.authorize("alice.worker1", "x").await });

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let request: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(request["id"], json!("auth"));
        assert_eq!(request["method"], json!("mining.authorize"));
        assert_eq!(request["params"], json!(["alice.worker1", "x"]));

        writer
            .write_all(br#"{"id":"auth","result":true,"error":null}"#)
            .await
            .unwrap();
        writer.write_all(b"\n").await.unwrap();
        writer.flush().await.unwrap();

        assert!(call.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn submit_reports_rejection_reason_as_an_error() {
        let (client, listener) = fake_pool().await;
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut writer = BufWriter::new(write_half);

        let call = tokio::spawn(async move {
            client
                .submit(Submit {
                    username: "alice.worker1".into(),
                    job_id: "bf".into(),
                    hex_ntime: "504e86ed".into(),
                    hex_nonce: "b2957c02".into(),
                })
                .await
        });

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();

        writer
            .write_all(br#"{"id":0,"result":null,"error":[23,"Low difficulty share",null]}"#)
            .await
            .unwrap();
        writer.write_all(b"\n").await.unwrap();
        writer.flush().await.unwrap();

        assert!(call.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn events_receives_fanned_out_notify_and_set_difficulty() {
        let (client, listener) = fake_pool().await;
        let (stream, _) = listener.accept().await.unwrap();
        let (_read_half, write_half) = stream.into_split();
        let mut writer = BufWriter::new(write_half);
        let mut events = client.events();

        writer
            .write_all(br#"{"id":null,"method":"mining.set_difficulty","params":[4.0]}"#)
            .await
            .unwrap();
        writer.write_all(b"\n").await.unwrap();
        writer.flush().await.unwrap();

        match events.recv().await.unwrap() {
            Event::SetDifficulty(diff) => assert_eq!(diff, 4.0),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
