//
//  Sample application.
//
//  Listens on localhost:4918, plain http, no ssl.
//  Connect to http://localhost:4918/
//

use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use futures_util::future::TryFutureExt;
use headers::{authorization::Basic, Authorization, HeaderMapExt};

use dav_lite::{body::Body, DavHandler, FileSystem};

#[derive(Clone)]
struct Server {
    dh: DavHandler,
    auth: bool,
}

impl Server {
    pub fn new(directory: Option<String>, prefix: Option<String>, sweep: u64, auth: bool) -> Self {
        let mut config = DavHandler::builder(match directory {
            Some(dir) => FileSystem::local(dir),
            None => FileSystem::Mem,
        })
        .sweep_interval(Duration::from_secs(sweep));
        if let Some(prefix) = prefix {
            config = config.strip_prefix(prefix);
        }

        Server {
            dh: config.build(),
            auth,
        }
    }

    async fn handle(
        &self,
        req: hyper::Request<hyper::Body>,
    ) -> Result<hyper::Response<Body>, Infallible> {
        if self.auth {
            // we want the client to authenticate.
            match req.headers().typed_get::<Authorization<Basic>>() {
                Some(Authorization(basic)) => {
                    log::debug!("request by {}", basic.username());
                }
                None => {
                    let mut response = hyper::Response::new(Body::from("please auth"));
                    *response.status_mut() = hyper::StatusCode::UNAUTHORIZED;
                    response.headers_mut().insert(
                        "WWW-Authenticate",
                        hyper::header::HeaderValue::from_static("Basic realm=\"foo\""),
                    );
                    return Ok(response);
                }
            }
        }
        Ok(self.dh.handle(req).await)
    }
}

#[derive(Debug, clap::Parser)]
#[command(about, version)]
struct Cli {
    /// port to listen on
    #[arg(short, long, default_value = "4918")]
    port: u16,
    /// local directory to serve
    #[arg(short, long)]
    dir: Option<String>,
    /// serve from ephemeral memory filesystem
    #[arg(short, long)]
    memfs: bool,
    /// path prefix to strip off request paths
    #[arg(long)]
    prefix: Option<String>,
    /// seconds between lock expiry sweeps
    #[arg(long, default_value = "3600")]
    sweep: u64,
    /// require basic authentication
    #[arg(short, long)]
    auth: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let Cli {
        port,
        dir,
        memfs,
        prefix,
        sweep,
        auth,
    } = Cli::parse();
    let dir = if memfs { None } else { dir };
    serve(dir, prefix, sweep, auth, port).await
}

async fn serve(
    dir: Option<String>,
    prefix: Option<String>,
    sweep: u64,
    auth: bool,
    port: u16,
) -> Result<(), Box<dyn Error>> {
    let name = dir.clone().unwrap_or_else(|| "memory filesystem".to_string());

    let dav_server = Server::new(dir, prefix, sweep, auth);
    dav_server.dh.spawn_lock_sweeper();

    let make_service = hyper::service::make_service_fn(|_| {
        let dav_server = dav_server.clone();
        async move {
            let func = move |req| {
                let dav_server = dav_server.clone();
                async move { dav_server.handle(req).await }
            };
            Ok::<_, hyper::Error>(hyper::service::service_fn(func))
        }
    });

    let addr = format!("0.0.0.0:{}", port);
    let addr = SocketAddr::from_str(&addr)?;

    let server = hyper::Server::try_bind(&addr)?
        .serve(make_service)
        .map_err(|e| eprintln!("server error: {}", e));

    println!("Serving {} on {}", name, port);
    let _ = server.await;
    Ok(())
}
