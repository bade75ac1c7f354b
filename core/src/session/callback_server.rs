//! Loopback HTTP listener for the OAuth authorization callback.
//!
//! Binds an ephemeral port on localhost, waits for the provider redirect,
//! validates the `state` parameter, and extracts the authorization code.
//! Explicit denial (`error=access_denied`) is an outcome, not an error.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::net::TcpListener;
use std::net::TcpStream;
use std::time::Duration;
use std::time::Instant;

use super::SessionError;

/// What came back on the authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Authorization code; state has already been validated.
    Granted {
        /// The authorization code to exchange with the backend.
        code: String,
    },
    /// The user denied the authorization request.
    Denied,
}

/// One-shot HTTP server receiving the authorization redirect.
pub struct CallbackServer {
    listener: TcpListener,
    port: u16,
}

impl CallbackServer {
    /// Binds to localhost on an ephemeral port.
    pub fn bind() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    /// Port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI to register in the authorization URL.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    /// Waits for the redirect and returns the callback outcome.
    ///
    /// Blocks until a request arrives or `timeout` elapses. The caller
    /// decides how an expired wait maps onto the sign-in contract.
    ///
    /// # Errors
    ///
    /// - [`SessionError::CallbackTimeout`] if nothing connects in time
    /// - [`SessionError::Provider`] on a provider error other than
    ///   denial, or on a state mismatch
    /// - [`SessionError::InvalidResponse`] if the redirect carries no
    ///   usable parameters
    pub fn wait(
        &self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<CallbackOutcome, SessionError> {
        let mut stream = self.accept_with_timeout(timeout)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;

        let params = parse_callback_params(&request_line)?;

        if let Some(error) = params.error {
            if error == "access_denied" {
                respond(&mut stream, 200, DENIED_PAGE)?;
                return Ok(CallbackOutcome::Denied);
            }
            respond(&mut stream, 400, FAILURE_PAGE)?;
            return Err(SessionError::Provider {
                error,
                description: "authorization failed at the provider".to_string(),
            });
        }

        if params.state.as_deref() != Some(expected_state) {
            respond(&mut stream, 400, FAILURE_PAGE)?;
            return Err(SessionError::Provider {
                error: "state_mismatch".to_string(),
                description: "CSRF protection: state parameter mismatch".to_string(),
            });
        }

        let Some(code) = params.code else {
            respond(&mut stream, 400, FAILURE_PAGE)?;
            return Err(SessionError::InvalidResponse(
                "no authorization code in callback".to_string(),
            ));
        };

        respond(&mut stream, 200, SUCCESS_PAGE)?;
        Ok(CallbackOutcome::Granted { code })
    }

    /// Polls `accept` until a connection arrives or the deadline passes.
    fn accept_with_timeout(&self, timeout: Duration) -> Result<TcpStream, SessionError> {
        self.listener.set_nonblocking(true)?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(100);

        let stream = loop {
            match self.listener.accept() {
                Ok((stream, _)) => break stream,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() >= timeout {
                        return Err(SessionError::CallbackTimeout);
                    }
                    std::thread::sleep(poll_interval);
                }
                Err(e) => return Err(SessionError::Io(e)),
            }
        };

        stream.set_nonblocking(false)?;
        Ok(stream)
    }
}

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Signed in</title></head>\
    <body><h1>Signed in</h1><p>You can close this window and return to the app.</p></body></html>";

const DENIED_PAGE: &str = "<!DOCTYPE html><html><head><title>Access denied</title></head>\
    <body><h1>Access denied</h1><p>You can close this window.</p></body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html><html><head><title>Sign-in failed</title></head>\
    <body><h1>Sign-in failed</h1><p>Please return to the app and try again.</p></body></html>";

fn respond(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = if status == 200 { "OK" } else { "Bad Request" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

/// Query parameters extracted from the redirect request line.
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Parses `code`, `state`, and `error` out of a request line such as
/// `GET /callback?code=XXX&state=YYY HTTP/1.1`.
fn parse_callback_params(request_line: &str) -> Result<CallbackParams, SessionError> {
    let path = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| SessionError::InvalidResponse("missing path in callback".to_string()))?;

    let query = path.split('?').nth(1).ok_or_else(|| {
        SessionError::InvalidResponse("missing query string in callback".to_string())
    })?;

    let mut params = CallbackParams {
        code: None,
        state: None,
        error: None,
    };

    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or("");
        let value = percent_decode(parts.next().unwrap_or(""));

        match key {
            "code" => params.code = Some(value),
            "state" => params.state = Some(value),
            "error" => params.error = Some(value),
            _ => {}
        }
    }

    if params.code.is_none() && params.state.is_none() && params.error.is_none() {
        return Err(SessionError::InvalidResponse(
            "callback carried no recognized parameters".to_string(),
        ));
    }

    Ok(params)
}

/// Minimal percent-decoding for OAuth query parameters.
///
/// Handles `%XX` sequences and `+` as space; invalid sequences pass
/// through unchanged.
fn percent_decode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '%' => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                } else {
                    result.push('%');
                    result.push_str(&hex);
                }
            }
            '+' => result.push(' '),
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bind_assigns_ephemeral_port() {
        let server = CallbackServer::bind().unwrap();
        assert!(server.port() > 0);
        assert_eq!(
            server.redirect_uri(),
            format!("http://127.0.0.1:{}/callback", server.port())
        );
    }

    #[test]
    fn parse_granted_callback() {
        let params =
            parse_callback_params("GET /callback?code=abc123&state=xyz789 HTTP/1.1").unwrap();
        assert_eq!(params.code, Some("abc123".to_string()));
        assert_eq!(params.state, Some("xyz789".to_string()));
        assert_eq!(params.error, None);
    }

    #[test]
    fn parse_denied_callback() {
        let params =
            parse_callback_params("GET /callback?error=access_denied&state=xyz HTTP/1.1").unwrap();
        assert_eq!(params.code, None);
        assert_eq!(params.error, Some("access_denied".to_string()));
    }

    #[test]
    fn parse_url_encoded_values() {
        let params =
            parse_callback_params("GET /callback?code=abc%2B123&state=xyz%3D789 HTTP/1.1").unwrap();
        assert_eq!(params.code, Some("abc+123".to_string()));
        assert_eq!(params.state, Some("xyz=789".to_string()));
    }

    #[test]
    fn parse_rejects_missing_query() {
        assert!(parse_callback_params("GET /callback HTTP/1.1").is_err());
    }

    #[test]
    fn wait_times_out_without_connection() {
        let server = CallbackServer::bind().unwrap();
        let result = server.wait("state", Duration::from_millis(150));
        assert!(matches!(result, Err(SessionError::CallbackTimeout)));
    }

    #[test]
    fn wait_accepts_granted_redirect() {
        let server = CallbackServer::bind().unwrap();
        let uri = format!(
            "127.0.0.1:{}",
            server.port()
        );

        let handle = std::thread::spawn(move || {
            // Give the listener a moment, then play the browser role.
            std::thread::sleep(Duration::from_millis(50));
            let mut stream = TcpStream::connect(uri).unwrap();
            stream
                .write_all(b"GET /callback?code=abc&state=expected HTTP/1.1\r\n\r\n")
                .unwrap();
            let mut response = String::new();
            let mut reader = BufReader::new(&stream);
            reader.read_line(&mut response).unwrap();
            response
        });

        let outcome = server.wait("expected", Duration::from_secs(2)).unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Granted {
                code: "abc".to_string()
            }
        );
        let response = handle.join().unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
    }

    #[test]
    fn wait_rejects_state_mismatch() {
        let server = CallbackServer::bind().unwrap();
        let uri = format!("127.0.0.1:{}", server.port());

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            let mut stream = TcpStream::connect(uri).unwrap();
            stream
                .write_all(b"GET /callback?code=abc&state=forged HTTP/1.1\r\n\r\n")
                .unwrap();
            let mut response = String::new();
            let mut reader = BufReader::new(&stream);
            reader.read_line(&mut response).unwrap();
            response
        });

        let result = server.wait("expected", Duration::from_secs(2));
        assert!(matches!(
            result,
            Err(SessionError::Provider { ref error, .. }) if error == "state_mismatch"
        ));
        let response = handle.join().unwrap();
        assert!(response.starts_with("HTTP/1.1 400"));
    }

    #[test]
    fn wait_reports_denial_as_outcome() {
        let server = CallbackServer::bind().unwrap();
        let uri = format!("127.0.0.1:{}", server.port());

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            let mut stream = TcpStream::connect(uri).unwrap();
            stream
                .write_all(b"GET /callback?error=access_denied&state=expected HTTP/1.1\r\n\r\n")
                .unwrap();
            let mut response = String::new();
            let mut reader = BufReader::new(&stream);
            reader.read_line(&mut response).unwrap();
        });

        let outcome = server.wait("expected", Duration::from_secs(2)).unwrap();
        assert_eq!(outcome, CallbackOutcome::Denied);
        handle.join().unwrap();
    }
}
