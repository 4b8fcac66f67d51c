use crate::error::ZmqcError;
use std::fmt;
use std::str::FromStr;

/// A socket option given on the command line as `NAME=VALUE`.
///
/// Names follow libzmq (`man zmq_setsockopt`) with the `ZMQ_` prefix optional.
/// Values are parsed according to the option's type before any socket exists,
/// so a bad option is a configuration error rather than a setup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOption {
  // Byte-string options
  Subscribe(Vec<u8>),
  Unsubscribe(Vec<u8>),
  RoutingId(Vec<u8>), // Often called ZMQ_IDENTITY
  // Integer options
  Linger(i32),
  SndHwm(i32),
  RcvHwm(i32),
  RcvTimeo(i32),
  SndTimeo(i32),
  ReconnectIvl(i32),
  ReconnectIvlMax(i32),
  Backlog(i32),
  Rate(i32),
  RecoveryIvl(i32),
  SndBuf(i32),
  RcvBuf(i32),
  TcpKeepalive(i32), // -1 system default, 0 off, 1 on
  HeartbeatIvl(i32),
  HeartbeatTimeout(i32),
  HeartbeatTtl(i32),
  ConnectTimeout(i32),
  MaxMsgSize(i64),
  Affinity(u64),
  // Boolean options
  Ipv6(bool),
  Immediate(bool),
  Conflate(bool),
}

impl SocketOption {
  /// Canonical libzmq name, without the `ZMQ_` prefix.
  pub fn name(&self) -> &'static str {
    match self {
      SocketOption::Subscribe(_) => "SUBSCRIBE",
      SocketOption::Unsubscribe(_) => "UNSUBSCRIBE",
      SocketOption::RoutingId(_) => "ROUTING_ID",
      SocketOption::Linger(_) => "LINGER",
      SocketOption::SndHwm(_) => "SNDHWM",
      SocketOption::RcvHwm(_) => "RCVHWM",
      SocketOption::RcvTimeo(_) => "RCVTIMEO",
      SocketOption::SndTimeo(_) => "SNDTIMEO",
      SocketOption::ReconnectIvl(_) => "RECONNECT_IVL",
      SocketOption::ReconnectIvlMax(_) => "RECONNECT_IVL_MAX",
      SocketOption::Backlog(_) => "BACKLOG",
      SocketOption::Rate(_) => "RATE",
      SocketOption::RecoveryIvl(_) => "RECOVERY_IVL",
      SocketOption::SndBuf(_) => "SNDBUF",
      SocketOption::RcvBuf(_) => "RCVBUF",
      SocketOption::TcpKeepalive(_) => "TCP_KEEPALIVE",
      SocketOption::HeartbeatIvl(_) => "HEARTBEAT_IVL",
      SocketOption::HeartbeatTimeout(_) => "HEARTBEAT_TIMEOUT",
      SocketOption::HeartbeatTtl(_) => "HEARTBEAT_TTL",
      SocketOption::ConnectTimeout(_) => "CONNECT_TIMEOUT",
      SocketOption::MaxMsgSize(_) => "MAXMSGSIZE",
      SocketOption::Affinity(_) => "AFFINITY",
      SocketOption::Ipv6(_) => "IPV6",
      SocketOption::Immediate(_) => "IMMEDIATE",
      SocketOption::Conflate(_) => "CONFLATE",
    }
  }

  pub fn is_subscribe(&self) -> bool {
    matches!(self, SocketOption::Subscribe(_))
  }

  /// Applies the option to a libzmq socket.
  pub fn apply(&self, socket: &zmq::Socket) -> Result<(), zmq::Error> {
    match self {
      SocketOption::Subscribe(v) => socket.set_subscribe(v),
      SocketOption::Unsubscribe(v) => socket.set_unsubscribe(v),
      SocketOption::RoutingId(v) => socket.set_identity(v),
      SocketOption::Linger(v) => socket.set_linger(*v),
      SocketOption::SndHwm(v) => socket.set_sndhwm(*v),
      SocketOption::RcvHwm(v) => socket.set_rcvhwm(*v),
      SocketOption::RcvTimeo(v) => socket.set_rcvtimeo(*v),
      SocketOption::SndTimeo(v) => socket.set_sndtimeo(*v),
      SocketOption::ReconnectIvl(v) => socket.set_reconnect_ivl(*v),
      SocketOption::ReconnectIvlMax(v) => socket.set_reconnect_ivl_max(*v),
      SocketOption::Backlog(v) => socket.set_backlog(*v),
      SocketOption::Rate(v) => socket.set_rate(*v),
      SocketOption::RecoveryIvl(v) => socket.set_recovery_ivl(*v),
      SocketOption::SndBuf(v) => socket.set_sndbuf(*v),
      SocketOption::RcvBuf(v) => socket.set_rcvbuf(*v),
      SocketOption::TcpKeepalive(v) => socket.set_tcp_keepalive(*v),
      SocketOption::HeartbeatIvl(v) => socket.set_heartbeat_ivl(*v),
      SocketOption::HeartbeatTimeout(v) => socket.set_heartbeat_timeout(*v),
      SocketOption::HeartbeatTtl(v) => socket.set_heartbeat_ttl(*v),
      SocketOption::ConnectTimeout(v) => socket.set_connect_timeout(*v),
      SocketOption::MaxMsgSize(v) => socket.set_maxmsgsize(*v),
      SocketOption::Affinity(v) => socket.set_affinity(*v),
      SocketOption::Ipv6(v) => socket.set_ipv6(*v),
      SocketOption::Immediate(v) => socket.set_immediate(*v),
      SocketOption::Conflate(v) => socket.set_conflate(*v),
    }
  }
}

impl fmt::Display for SocketOption {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for SocketOption {
  type Err = ZmqcError;

  fn from_str(spec: &str) -> Result<Self, Self::Err> {
    let (raw_name, raw_value) = spec
      .split_once('=')
      .filter(|(name, _)| is_option_name(name))
      .ok_or_else(|| ZmqcError::Configuration(format!("Invalid option spec: '{}'", spec)))?;

    let upper = raw_name.to_ascii_uppercase();
    let name = upper.strip_prefix("ZMQ_").unwrap_or(&upper);

    let option = match name {
      "SUBSCRIBE" => SocketOption::Subscribe(raw_value.as_bytes().to_vec()),
      "UNSUBSCRIBE" => SocketOption::Unsubscribe(raw_value.as_bytes().to_vec()),
      "IDENTITY" | "ROUTING_ID" => SocketOption::RoutingId(raw_value.as_bytes().to_vec()),
      "LINGER" => SocketOption::Linger(parse_number(name, raw_value)?),
      "SNDHWM" => SocketOption::SndHwm(parse_number(name, raw_value)?),
      "RCVHWM" => SocketOption::RcvHwm(parse_number(name, raw_value)?),
      "RCVTIMEO" => SocketOption::RcvTimeo(parse_number(name, raw_value)?),
      "SNDTIMEO" => SocketOption::SndTimeo(parse_number(name, raw_value)?),
      "RECONNECT_IVL" => SocketOption::ReconnectIvl(parse_number(name, raw_value)?),
      "RECONNECT_IVL_MAX" => SocketOption::ReconnectIvlMax(parse_number(name, raw_value)?),
      "BACKLOG" => SocketOption::Backlog(parse_number(name, raw_value)?),
      "RATE" => SocketOption::Rate(parse_number(name, raw_value)?),
      "RECOVERY_IVL" => SocketOption::RecoveryIvl(parse_number(name, raw_value)?),
      "SNDBUF" => SocketOption::SndBuf(parse_number(name, raw_value)?),
      "RCVBUF" => SocketOption::RcvBuf(parse_number(name, raw_value)?),
      "TCP_KEEPALIVE" => SocketOption::TcpKeepalive(parse_keepalive_mode(name, raw_value)?),
      "HEARTBEAT_IVL" => SocketOption::HeartbeatIvl(parse_number(name, raw_value)?),
      "HEARTBEAT_TIMEOUT" => SocketOption::HeartbeatTimeout(parse_number(name, raw_value)?),
      "HEARTBEAT_TTL" => SocketOption::HeartbeatTtl(parse_number(name, raw_value)?),
      "CONNECT_TIMEOUT" => SocketOption::ConnectTimeout(parse_number(name, raw_value)?),
      "MAXMSGSIZE" => SocketOption::MaxMsgSize(parse_number(name, raw_value)?),
      "AFFINITY" => SocketOption::Affinity(parse_number(name, raw_value)?),
      "IPV6" => SocketOption::Ipv6(parse_bool(name, raw_value)?),
      "IMMEDIATE" => SocketOption::Immediate(parse_bool(name, raw_value)?),
      "CONFLATE" => SocketOption::Conflate(parse_bool(name, raw_value)?),
      _ => {
        return Err(ZmqcError::Configuration(format!(
          "Unrecognised socket option: '{}'",
          raw_name
        )))
      }
    };
    Ok(option)
  }
}

// --- Helper functions for parsing option values ---

fn is_option_name(name: &str) -> bool {
  !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn invalid_value(name: &str, raw: &str) -> ZmqcError {
  ZmqcError::Configuration(format!("Invalid value for option {}: '{}'", name, raw))
}

/// Parses an integer-typed option value (HWM, linger, timeouts, ...).
fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, ZmqcError> {
  raw.trim().parse::<T>().map_err(|_| invalid_value(name, raw))
}

/// Parses a boolean option: `1`/`0` as libzmq expects, or `true`/`false`.
fn parse_bool(name: &str, raw: &str) -> Result<bool, ZmqcError> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" => Ok(true),
    "0" | "false" => Ok(false),
    _ => Err(invalid_value(name, raw)),
  }
}

/// Parses the ZMQ_TCP_KEEPALIVE option (-1, 0, 1).
fn parse_keepalive_mode(name: &str, raw: &str) -> Result<i32, ZmqcError> {
  let val: i32 = parse_number(name, raw)?;
  if (-1..=1).contains(&val) {
    Ok(val)
  } else {
    Err(invalid_value(name, raw))
  }
}
