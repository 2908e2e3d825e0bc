//! Endpoint resolution - where the game server lives.
//!
//! In a browser this comes from `window.location`. Here it is an injected
//! capability so channels and HTTP clients can be built against any host.

use url::Url;

/// Default server port in local development.
pub const DEV_SERVER_PORT: u16 = 8000;

/// Scheme, host and optional port of the game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// Whether the hosting page was loaded over a secure scheme.
    pub secure: bool,
    pub host: String,
    /// `None` means implicit from the scheme.
    pub port: Option<u16>,
}

impl ServerEndpoint {
    /// Local development server: `localhost:8000`, insecure.
    pub fn development() -> Self {
        Self::development_on(DEV_SERVER_PORT)
    }

    pub fn development_on(port: u16) -> Self {
        Self {
            secure: false,
            host: "localhost".to_string(),
            port: Some(port),
        }
    }

    /// Deployed server, derived from the hosting page URL.
    ///
    /// The scheme picks secure/insecure, the host is reused and the port is
    /// left implicit.
    pub fn from_page_url(page: &Url) -> Option<Self> {
        let host = page.host_str()?.to_string();
        Some(Self {
            secure: page.scheme() == "https",
            host,
            port: None,
        })
    }

    fn base(&self, secure_scheme: &str, plain_scheme: &str) -> Result<Url, url::ParseError> {
        let scheme = if self.secure {
            secure_scheme
        } else {
            plain_scheme
        };
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };
        Url::parse(&format!("{scheme}://{authority}/"))
    }

    /// `<ws|wss>://<host>[:<port>]/ws/<room_id>/<player_id>`
    pub fn websocket_url(&self, room_id: &str, player_id: &str) -> Result<Url, url::ParseError> {
        let mut url = self.base("wss", "ws")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .clear()
            .extend(["ws", room_id, player_id]);
        Ok(url)
    }

    /// Base URL for the room-management HTTP API.
    pub fn http_base(&self) -> Result<Url, url::ParseError> {
        self.base("https", "http")
    }
}

/// Yields the current server endpoint.
pub trait EndpointResolver: Send + Sync {
    fn endpoint(&self) -> ServerEndpoint;
}

/// Resolver that always returns the same endpoint.
#[derive(Debug, Clone)]
pub struct StaticEndpoint(pub ServerEndpoint);

impl EndpointResolver for StaticEndpoint {
    fn endpoint(&self) -> ServerEndpoint {
        self.0.clone()
    }
}
