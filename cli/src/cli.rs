use clap::{ArgGroup, Parser};
use std::time::Duration;
use zmqc::{Behavior, BridgeConfig, Delimiter, MessageBudget, PumpConfig, SocketConfig, SocketKind, SocketOption};

#[derive(Parser, Debug)]
#[clap(
  name = "zmqc",
  version,
  about = "Pipe standard input/output through a ZeroMQ socket",
  after_help = "Examples:\n  zmqc -w -c PUSH tcp://127.0.0.1:5555 < lines.txt\n  zmqc -r -b PULL tcp://*:5555\n  zmqc -r -c SUB -o SUBSCRIBE=news tcp://127.0.0.1:5556"
)]
#[clap(group(ArgGroup::new("behavior").required(true).args(["bind", "connect"])))]
pub struct Cli {
  /// Separate messages with NUL (\0) instead of newline, on both input and output
  #[clap(short = '0', action)]
  pub null: bool,

  /// Process only NUM messages, then exit (REQ/REP count request/reply exchanges)
  #[clap(short = 'n', value_name = "NUM")]
  pub count: Option<u64>,

  /// Read messages from the socket and write them to stdout
  #[clap(short, long, action)]
  pub read: bool,

  /// Read records from stdin and send them on the socket
  #[clap(short, long, action)]
  pub write: bool,

  /// Bind to every address
  #[clap(short, long, action)]
  pub bind: bool,

  /// Connect to every address
  #[clap(short, long, action)]
  pub connect: bool,

  /// Socket type: PUSH, PULL, PUB, SUB, REQ, REP or PAIR (case-insensitive)
  #[clap(value_name = "SOCK_TYPE", value_parser = parse_socket_kind)]
  pub socket_type: SocketKind,

  /// Socket option applied before bind/connect, e.g. SUBSCRIBE=topic or SNDHWM=1000 (repeatable)
  #[clap(short = 'o', long = "option", value_name = "SOCK_OPT=VALUE", value_parser = parse_socket_option)]
  pub options: Vec<SocketOption>,

  /// Give up on a send after this many retries on a full peer queue (default: retry forever)
  #[clap(long, value_name = "N")]
  pub max_send_retries: Option<u32>,

  /// Milliseconds to keep flushing queued messages when the socket closes (`-o LINGER=N` wins)
  #[clap(long, value_name = "MS", default_value_t = 1000)]
  pub linger: u64,

  /// Log debug information to stderr
  #[clap(short, long, action)]
  pub verbose: bool,

  /// One or more ZeroMQ endpoints, e.g. tcp://127.0.0.1:5555 or ipc:///tmp/feed
  #[clap(value_name = "ADDRESS", required = true, num_args = 1..)]
  pub addresses: Vec<String>,
}

impl Cli {
  pub fn behavior(&self) -> Behavior {
    if self.bind {
      Behavior::Bind
    } else {
      Behavior::Connect
    }
  }

  pub fn delimiter(&self) -> Delimiter {
    if self.null {
      Delimiter::Null
    } else {
      Delimiter::Newline
    }
  }

  /// Turns parsed arguments into the library's run configuration.
  ///
  /// The mode is derived here but not validated; callers check it before opening the socket.
  pub fn bridge_config(&self) -> BridgeConfig {
    let socket = SocketConfig::new(self.socket_type, self.behavior(), self.addresses.clone())
      .with_options(self.options.clone())
      .with_linger(Duration::from_millis(self.linger));

    let pump = PumpConfig {
      max_send_retries: self.max_send_retries,
      ..PumpConfig::default()
    };

    BridgeConfig::new(socket, self.read, self.write)
      .with_delimiter(self.delimiter())
      .with_budget(MessageBudget::from_limit(self.count))
      .with_pump_config(pump)
  }
}

fn parse_socket_kind(raw: &str) -> Result<SocketKind, String> {
  raw.parse::<SocketKind>().map_err(|e| e.to_string())
}

fn parse_socket_option(raw: &str) -> Result<SocketOption, String> {
  raw.parse::<SocketOption>().map_err(|e| e.to_string())
}
