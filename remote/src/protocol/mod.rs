//! FTP control-channel vocabulary: commands, replies and reply parsing (RFC 959).

/// A complete server reply. Multi-line replies have their lines joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// 1xx: the requested action is being initiated, expect another reply.
    #[must_use]
    pub fn is_positive_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx: the requested action has been successfully completed.
    #[must_use]
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx: the command was accepted but more information is needed (e.g. PASS after USER).
    #[must_use]
    pub fn is_positive_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        (400..600).contains(&self.code)
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

pub mod codes {
    pub const SERVICE_READY_IN_MINUTES: u16 = 120;
    pub const ENTERING_PASSIVE_MODE: u16 = 227;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    User(&'a str),
    Pass(&'a str),
    OptsUtf8On,
    TypeBinary,
    Pasv,
    Cwd(&'a str),
    Retr(&'a str),
    Noop,
    Quit,
}

impl Command<'_> {
    /// Wire form without the line terminator.
    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Command::User(user) => format!("USER {user}"),
            Command::Pass(pass) => format!("PASS {pass}"),
            Command::OptsUtf8On => "OPTS UTF8 ON".to_string(),
            Command::TypeBinary => "TYPE I".to_string(),
            Command::Pasv => "PASV".to_string(),
            Command::Cwd(path) => format!("CWD {path}"),
            Command::Retr(name) => format!("RETR {name}"),
            Command::Noop => "NOOP".to_string(),
            Command::Quit => "QUIT".to_string(),
        }
    }
}

/// Same as the wire form, with the password masked.
impl std::fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Pass(_) => write!(f, "PASS ****"),
            other => write!(f, "{}", other.to_line()),
        }
    }
}

/// One line of a reply: `123 text` ends the reply, `123-text` starts a multi-line one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    pub code: u16,
    pub last: bool,
    pub text: &'a str,
}

/// Parses a line that begins with a reply code. Returns `None` for continuation lines of
/// a multi-line reply that carry no code.
pub fn parse_reply_line(line: &str) -> Option<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code = line[..3].parse().ok()?;
    match bytes.get(3) {
        None => Some(ReplyLine {
            code,
            last: true,
            text: "",
        }),
        Some(b' ') => Some(ReplyLine {
            code,
            last: true,
            text: &line[4..],
        }),
        Some(b'-') => Some(ReplyLine {
            code,
            last: false,
            text: &line[4..],
        }),
        Some(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed passive mode reply: '{0}'")]
pub struct PasvParseError(pub String);

/// Extracts the data-channel address from a 227 reply text such as
/// `Entering Passive Mode (192,168,1,2,195,80).`
pub fn parse_pasv(text: &str) -> Result<std::net::SocketAddrV4, PasvParseError> {
    let malformed = || PasvParseError(text.to_string());
    let start = match text.find('(') {
        Some(paren) => paren + 1,
        None => text.find(|c: char| c.is_ascii_digit()).ok_or_else(malformed)?,
    };
    let numbers: Vec<u8> = text[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == ','))
        .next()
        .ok_or_else(malformed)?
        .split(',')
        .map(|part| part.trim().parse::<u8>().map_err(|_| malformed()))
        .collect::<Result<_, _>>()?;
    let [h1, h2, h3, h4, p1, p2] = numbers[..] else {
        return Err(malformed());
    };
    Ok(std::net::SocketAddrV4::new(
        std::net::Ipv4Addr::new(h1, h2, h3, h4),
        (u16::from(p1) << 8) | u16::from(p2),
    ))
}

/// Formats an address the way [`parse_pasv`] expects it.
#[must_use]
pub fn format_pasv(addr: std::net::SocketAddrV4) -> String {
    let [h1, h2, h3, h4] = addr.ip().octets();
    let port = addr.port();
    format!(
        "Entering Passive Mode ({h1},{h2},{h3},{h4},{},{})",
        port >> 8,
        port & 0xff
    )
}
