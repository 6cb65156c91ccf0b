use std::env;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = nestegg::api::run_http_server(port).await {
                log::error!("server error: {e}");
                std::process::exit(1);
            }
        }
        Some("project") => match nestegg::api::run_cli(&raw_args[1..]) {
            Ok(output) => println!("{output}"),
            Err(msg) => {
                eprintln!("{msg}");
                std::process::exit(2);
            }
        },
        _ => {
            eprintln!("Usage: nestegg serve [port] | nestegg project --help");
            std::process::exit(1);
        }
    }
}
