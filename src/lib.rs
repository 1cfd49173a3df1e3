use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::{Arguments, Device},
    bitcoin::hashes::{Hash, sha256, sha256d},
    clap::Parser,
    derive_more::Display,
    difficulty::share_target,
    hash_rate::HashRate,
    program::{Mempool, assemble, execute, meets_target},
    rand::Rng,
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::{Value, json},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    share::{Share, ShareQueue, Stats},
    shared_work::SharedWork,
    std::{
        collections::VecDeque,
        env,
        fmt::{self, Display, Formatter},
        net::ToSocketAddrs,
        process,
        str::FromStr,
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        thread,
        time::{Duration, Instant},
    },
    stratum::{Authorize, Id, JsonRpcError, Message, Notify, SetDifficulty, Submit},
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter},
        net::TcpStream,
        sync::{Notify as AsyncNotify, broadcast, mpsc, oneshot},
        time::sleep,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    tracing_subscriber::EnvFilter,
    work::Work,
};

mod arguments;
mod controller;
mod difficulty;
mod error;
pub mod gpu;
mod hash_rate;
mod nonce;
pub mod program;
mod share;
mod shared_work;
mod si;
mod signal;
mod stats;
pub mod stratum;
mod work;
mod worker;

pub use error::MinerError;

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub const USER_AGENT: &str = "progminer/0.1.0";

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Arguments::parse();

    match controller::run(args) {
        Err(err) => {
            error!("error: {err:#}");

            if env::var_os("RUST_BACKTRACE")
                .map(|val| val == "1")
                .unwrap_or_default()
            {
                error!("{}", err.backtrace());
            }
            process::exit(1);
        }
        Ok(()) => {
            process::exit(0);
        }
    }
}
