use crate::FetchConfig;
use recast_chain::{FetchError, FetchedRecipe, RecipeFetcher, BRANCH_PLACEHOLDER};
use std::io::Read;
use std::time::Duration;

/// Fetches recipes and init scripts over HTTP.
///
/// The `{branch}` placeholder is substituted with the requested branch
/// first; on 404 each configured fallback branch is tried in order. The
/// returned recipe records the URL that answered.
pub struct HttpFetcher {
    config: FetchConfig,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        Self { config, agent }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Branches to try for `branch`, requested one first, without repeats.
    fn branches<'a>(&'a self, branch: &'a str) -> Vec<&'a str> {
        let mut branches = vec![branch];
        for fallback in &self.config.fallback_branches {
            if !branches.contains(&fallback.as_str()) {
                branches.push(fallback);
            }
        }
        branches
    }

    fn do_get(&self, url: &str) -> Result<String, FetchError> {
        let mut req = self
            .agent
            .get(url)
            .header("User-Agent", &self.config.user_agent);
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(FetchError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(FetchError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(FetchError::Transport(e.to_string()));
            }
        };

        let mut bytes = Vec::new();
        resp.into_body()
            .into_reader()
            .take(self.config.max_body_bytes)
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let body = decode_body(bytes);
        if body.trim().is_empty() {
            return Err(FetchError::NotFound(url.to_owned()));
        }
        Ok(body)
    }
}

/// Decode a possibly capped body. A character split by the cap is dropped;
/// other invalid sequences become U+FFFD.
fn decode_body(mut bytes: Vec<u8>) -> String {
    if let Err(e) = std::str::from_utf8(&bytes) {
        if e.error_len().is_none() {
            bytes.truncate(e.valid_up_to());
        }
    }
    match String::from_utf8(bytes) {
        Ok(body) => body,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

impl RecipeFetcher for HttpFetcher {
    fn fetch_recipe(&self, template: &str, branch: &str) -> Result<FetchedRecipe, FetchError> {
        if !template.contains(BRANCH_PLACEHOLDER) {
            tracing::debug!("GET {template}");
            let content = self.do_get(template)?;
            return Ok(FetchedRecipe {
                content,
                url: template.to_owned(),
            });
        }

        let mut first_missing = None;
        for candidate in self.branches(branch) {
            let url = template.replacen(BRANCH_PLACEHOLDER, candidate, 1);
            tracing::debug!("GET {url}");
            match self.do_get(&url) {
                Ok(content) => return Ok(FetchedRecipe { content, url }),
                Err(FetchError::NotFound(missing)) => {
                    tracing::debug!(branch = candidate, "not found, trying next branch");
                    first_missing.get_or_insert(missing);
                }
                Err(e) => return Err(e),
            }
        }
        Err(FetchError::NotFound(
            first_missing.unwrap_or_else(|| template.to_owned()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// A captured HTTP request for header inspection.
    #[derive(Debug, Clone)]
    struct CapturedRequest {
        path: String,
        headers: HashMap<String, String>,
    }

    /// Serves fixed bodies by path; anything else is 404.
    struct MockServer {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    impl MockServer {
        fn start(routes: &[(&str, u16, &str)]) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
                routes
                    .iter()
                    .map(|(path, status, body)| ((*path).to_owned(), (*status, (*body).to_owned())))
                    .collect(),
            );
            let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));

            let requests_clone = Arc::clone(&requests);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let routes = Arc::clone(&routes);
                    let reqs = Arc::clone(&requests_clone);

                    std::thread::spawn(move || {
                        let mut reader = BufReader::new(stream.try_clone().unwrap());
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).is_err() {
                            return;
                        }
                        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                        if parts.len() < 2 {
                            return;
                        }
                        let path = parts[1].to_owned();

                        let mut headers = HashMap::new();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                                break;
                            }
                            if let Some((k, v)) = line.trim().split_once(": ") {
                                headers.insert(k.to_lowercase(), v.to_owned());
                            }
                        }
                        reqs.lock().unwrap().push(CapturedRequest {
                            path: path.clone(),
                            headers,
                        });

                        let (status, body) = routes
                            .get(&path)
                            .cloned()
                            .unwrap_or((404, String::new()));
                        let reason = match status {
                            200 => "OK",
                            404 => "Not Found",
                            _ => "Error",
                        };
                        let response = format!(
                            "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        let _ = stream.write_all(response.as_bytes());
                        let _ = stream.flush();
                    });
                }
            });

            MockServer {
                addr,
                _handle: handle,
                requests,
            }
        }

        fn captured_requests(&self) -> Vec<CapturedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(FetchConfig::default().with_timeout(5))
    }

    #[test]
    fn fetches_requested_branch() {
        let server = MockServer::start(&[("/acme/app/master/Dockerfile", 200, "FROM alpine\n")]);
        let template = format!("{}/acme/app/{{branch}}/Dockerfile", server.addr);
        let fetched = fetcher().fetch_recipe(&template, "master").unwrap();
        assert_eq!(fetched.content, "FROM alpine\n");
        assert_eq!(fetched.url, format!("{}/acme/app/master/Dockerfile", server.addr));
    }

    #[test]
    fn falls_back_to_next_branch_on_404() {
        let server = MockServer::start(&[("/acme/app/main/Dockerfile", 200, "FROM debian\n")]);
        let template = format!("{}/acme/app/{{branch}}/Dockerfile", server.addr);
        let fetched = fetcher().fetch_recipe(&template, "master").unwrap();
        assert_eq!(fetched.content, "FROM debian\n");
        assert!(fetched.url.ends_with("/main/Dockerfile"));

        let paths: Vec<String> = server.captured_requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec!["/acme/app/master/Dockerfile", "/acme/app/main/Dockerfile"]
        );
    }

    #[test]
    fn requested_branch_not_repeated_in_fallbacks() {
        let server = MockServer::start(&[]);
        let template = format!("{}/x/{{branch}}/Dockerfile", server.addr);
        let err = fetcher().fetch_recipe(&template, "main").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(ref url) if url.ends_with("/x/main/Dockerfile")));
        let paths: Vec<String> = server.captured_requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/x/main/Dockerfile", "/x/master/Dockerfile"]);
    }

    #[test]
    fn server_error_stops_fallback() {
        let server = MockServer::start(&[("/x/master/Dockerfile", 500, "boom")]);
        let template = format!("{}/x/{{branch}}/Dockerfile", server.addr);
        let err = fetcher().fetch_recipe(&template, "master").unwrap_err();
        assert!(matches!(err, FetchError::Http(ref msg) if msg.contains("500")));
        assert_eq!(server.captured_requests().len(), 1);
    }

    #[test]
    fn empty_body_counts_as_missing() {
        let server = MockServer::start(&[
            ("/x/master/Dockerfile", 200, ""),
            ("/x/main/Dockerfile", 200, "FROM alpine\n"),
        ]);
        let template = format!("{}/x/{{branch}}/Dockerfile", server.addr);
        let fetched = fetcher().fetch_recipe(&template, "master").unwrap();
        assert!(fetched.url.ends_with("/x/main/Dockerfile"));
    }

    #[test]
    fn template_without_placeholder_fetched_as_is() {
        let server = MockServer::start(&[("/plain/run", 200, "exec /app\n")]);
        let url = format!("{}/plain/run", server.addr);
        let fetched = fetcher().fetch_recipe(&url, "ignored").unwrap();
        assert_eq!(fetched.content, "exec /app\n");
        assert_eq!(fetched.url, url);
    }

    #[test]
    fn body_is_capped() {
        let long = "x".repeat(4096);
        let server = MockServer::start(&[("/big/master/Dockerfile", 200, long.as_str())]);
        let config = FetchConfig {
            max_body_bytes: 100,
            ..FetchConfig::default()
        };
        let template = format!("{}/big/{{branch}}/Dockerfile", server.addr);
        let fetched = HttpFetcher::new(config).fetch_recipe(&template, "master").unwrap();
        assert_eq!(fetched.content.len(), 100);
    }

    #[test]
    fn cap_inside_multibyte_char_truncates_cleanly() {
        // 'é' is two bytes; a 101-byte cap splits the 51st one
        let long = "é".repeat(200);
        let server = MockServer::start(&[("/utf/master/Dockerfile", 200, long.as_str())]);
        let config = FetchConfig {
            max_body_bytes: 101,
            ..FetchConfig::default()
        };
        let template = format!("{}/utf/{{branch}}/Dockerfile", server.addr);
        let fetched = HttpFetcher::new(config).fetch_recipe(&template, "master").unwrap();
        assert_eq!(fetched.content, "é".repeat(50));
    }

    #[test]
    fn decode_body_replaces_invalid_bytes_mid_stream() {
        assert_eq!(decode_body(b"FROM a\xffb\n".to_vec()), "FROM a\u{fffd}b\n");
        assert_eq!(decode_body("ab\u{e9}".as_bytes()[..3].to_vec()), "ab");
    }

    #[test]
    fn auth_token_and_user_agent_sent() {
        let server = MockServer::start(&[("/a/master/Dockerfile", 200, "FROM alpine\n")]);
        let fetcher = HttpFetcher::new(FetchConfig::default().with_token("secret-token-42"));
        let template = format!("{}/a/{{branch}}/Dockerfile", server.addr);
        fetcher.fetch_recipe(&template, "master").unwrap();

        let reqs = server.captured_requests();
        assert_eq!(
            reqs[0].headers.get("authorization"),
            Some(&"Bearer secret-token-42".to_owned())
        );
        assert!(reqs[0].headers["user-agent"].starts_with("recast/"));
    }

    #[test]
    fn no_auth_header_without_token() {
        let server = MockServer::start(&[("/a/master/Dockerfile", 200, "FROM alpine\n")]);
        let template = format!("{}/a/{{branch}}/Dockerfile", server.addr);
        fetcher().fetch_recipe(&template, "master").unwrap();
        assert!(!server.captured_requests()[0]
            .headers
            .contains_key("authorization"));
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = fetcher()
            .fetch_recipe(&format!("http://{addr}/x/{{branch}}/Dockerfile"), "master")
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
