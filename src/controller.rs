use super::*;

/// Entry point called synchronously from `main`. Builds its own multi-thread
/// runtime and blocks on it, matching how this codebase's other blocking
/// entry points bridge a synchronous `main` into async work.
pub(crate) fn run(args: Arguments) -> Result<()> {
    tokio::runtime::Runtime::new()
        .context("building the tokio runtime")?
        .block_on(run_async(args))
}

async fn run_async(args: Arguments) -> Result<()> {
    if args.device == Device::Gpu && !cfg!(feature = "opencl") {
        return Err(MinerError::GpuUnavailable.into());
    }

    let cancel = signal::setup_signal_handler();

    let stats = Arc::new(Stats::new());
    let shared_work = Arc::new(SharedWork::new());
    let queue = Arc::new(ShareQueue::new(stats.clone()));

    spawn_workers(&args, &shared_work, &queue, &stats)?;

    tokio::spawn(stats::report(stats.clone(), cancel.clone()));

    reconnect_loop(&args, shared_work, queue, stats, cancel).await;

    Ok(())
}

fn spawn_workers(args: &Arguments, shared_work: &Arc<SharedWork>, queue: &Arc<ShareQueue>, stats: &Arc<Stats>) -> Result<()> {
    match args.device {
        Device::Cpu => {
            for index in 0..args.num_workers {
                let shared_work = shared_work.clone();
                let queue = queue.clone();
                let stats = stats.clone();
                thread::Builder::new()
                    .name(format!("cpu-worker-{index}"))
                    .spawn(move || worker::run_cpu_worker(index, shared_work, queue, stats))
                    .context("spawning a CPU worker thread")?;
            }
        }
        Device::Gpu => spawn_gpu_worker(args, shared_work, queue, stats)?,
    }

    Ok(())
}

#[cfg(feature = "opencl")]
fn spawn_gpu_worker(args: &Arguments, shared_work: &Arc<SharedWork>, queue: &Arc<ShareQueue>, stats: &Arc<Stats>) -> Result<()> {
    let compute_units = args.num_workers as u32;
    let backend = gpu::opencl::OclBackend::new(args.platform_id, compute_units, args.local_work_size)
        .context("initializing the OpenCL backend")?;

    let shared_work = shared_work.clone();
    let queue = queue.clone();
    let stats = stats.clone();

    thread::Builder::new()
        .name("gpu-worker".into())
        .spawn(move || gpu::run_gpu_worker(backend, compute_units, shared_work, queue, stats))
        .context("spawning the GPU worker thread")?;

    Ok(())
}

#[cfg(not(feature = "opencl"))]
fn spawn_gpu_worker(_args: &Arguments, _shared_work: &Arc<SharedWork>, _queue: &Arc<ShareQueue>, _stats: &Arc<Stats>) -> Result<()> {
    unreachable!("Device::Gpu is rejected before workers are spawned when opencl is disabled")
}

/// Owns one connected session: authorizes, then runs the job-builder and
/// submitter tasks until the connection drops, at which point it returns so
/// the caller can retry (spec §4.7).
async fn reconnect_loop(
    args: &Arguments,
    shared_work: Arc<SharedWork>,
    queue: Arc<ShareQueue>,
    stats: Arc<Stats>,
    cancel: CancellationToken,
) {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    const RETRY_DELAY: Duration = Duration::from_secs(1);

    while !cancel.is_cancelled() {
        match stratum::Client::connect(&args.host, args.port, CONNECT_TIMEOUT).await {
            Ok(client) => {
                if let Err(error) = client.authorize(&args.user, &args.password).await {
                    warn!("authorize failed: {error:#}");
                } else {
                    run_session(client, args.user.clone(), &shared_work, &queue, &stats, &cancel).await;
                }
            }
            Err(error) => warn!("connect to {}:{} failed: {error:#}", args.host, args.port),
        }

        if cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = sleep(RETRY_DELAY) => {}
        }
    }
}

/// Drives one connected session: a job-builder task consuming
/// `mining.notify`/`mining.set_difficulty` pushes, and a submitter task
/// draining the share queue, both running until the connection's event
/// stream closes.
async fn run_session(
    client: stratum::Client,
    username: String,
    shared_work: &Arc<SharedWork>,
    queue: &Arc<ShareQueue>,
    stats: &Arc<Stats>,
    cancel: &CancellationToken,
) {
    let mut events = client.events();
    let mut program_cache: Option<(String, Vec<u32>)> = None;

    let submitter = {
        let client = client.clone();
        let shared_work = shared_work.clone();
        let queue = queue.clone();
        let stats = stats.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { submit_loop(client, username, shared_work, queue, stats, cancel).await })
    };

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => {
                match event {
                    Ok(stratum::Event::Notify(notify)) => {
                        let work = work::set_job(&notify, shared_work.clone_work().share_target, program_cache.as_ref());
                        program_cache = Some((work.program_text.clone(), work.bytecode.clone()));
                        shared_work.publish(work);
                    }
                    Ok(stratum::Event::SetDifficulty(diff)) => {
                        stats.set_latest_diff(diff);
                        shared_work.set_difficulty(difficulty::share_target(diff));
                    }
                    Ok(stratum::Event::Disconnected) | Err(_) => break,
                }
            }
        }
    }

    submitter.abort();
}

/// Drains found shares and submits them, dropping any whose generation no
/// longer matches the live job (spec §4.6's stale-share filter).
async fn submit_loop(
    client: stratum::Client,
    username: String,
    shared_work: Arc<SharedWork>,
    queue: Arc<ShareQueue>,
    stats: Arc<Stats>,
    cancel: CancellationToken,
) {
    loop {
        let shares = tokio::select! {
            () = cancel.cancelled() => break,
            shares = queue.drain() => shares,
        };

        for share in shares {
            if share.job_num != shared_work.num() {
                debug!("dropping stale share for job {}", share.job_id);
                continue;
            }

            let submit = stratum::Submit {
                username: username.clone(),
                job_id: share.job_id.clone(),
                hex_ntime: share.hex_ntime.clone(),
                hex_nonce: hex::encode(share.nonce),
            };

            match client.submit(submit).await {
                Ok(true) => stats.record_accepted(),
                Ok(false) => stats.record_rejected(),
                Err(error) => warn!("submit failed: {error}"),
            }
        }
    }
}
