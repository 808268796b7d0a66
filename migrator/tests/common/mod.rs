#![allow(dead_code)]

use {
    jsonrpc_core::{Error, ErrorCode, IoHandler, Params, Value},
    jsonrpc_http_server::{Server, ServerBuilder},
    std::{
        net::SocketAddr,
        sync::{Arc, Mutex},
        time::Duration,
    },
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub type Handler = Box<dyn Fn(Value) -> Result<Value, Error> + Send + Sync>;

/// JSON-RPC node on a local port. It runs its own event loop, so it must be
/// started and dropped outside of the test's tokio runtime.
pub struct MockNode {
    server: Option<Server>,
    pub url: String,
    pub requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockNode {
    pub fn start(methods: Vec<(&'static str, Handler)>) -> Self {
        let requests = Arc::new(Mutex::new(vec![]));
        let mut io = IoHandler::default();
        for (name, method) in methods {
            let requests = requests.clone();
            io.add_sync_method(name, move |params: Params| {
                let params: Value = params.into();
                requests.lock().unwrap().push((name.to_string(), params.clone()));
                method(params)
            });
        }
        let address: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = ServerBuilder::new(io).threads(1).start_http(&address).unwrap();
        let url = format!("http://{}", server.address());
        Self {
            server: Some(server),
            url,
            requests,
        }
    }

    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.close();
        }
    }
}

pub fn handler(f: impl Fn(Value) -> Result<Value, Error> + Send + Sync + 'static) -> Handler {
    Box::new(f)
}

pub fn reply(value: Value) -> Handler {
    handler(move |_| Ok(value.clone()))
}

pub fn fail(code: i64, message: &'static str) -> Handler {
    handler(move |_| {
        Err(Error {
            code: ErrorCode::ServerError(code),
            message: message.to_string(),
            data: None,
        })
    })
}

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}
