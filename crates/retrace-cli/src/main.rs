// Retrace CLI Entry Point

use retrace_cli::{output, router::CommandRouter};

#[tokio::main]
async fn main() {
    if let Err(e) = CommandRouter::route().await {
        output::print_error(&e.user_message());
        if std::env::args().any(|arg| arg == "-v" || arg == "--verbose") {
            eprintln!("{}", e.technical_details());
        }
        std::process::exit(1);
    }
}
