use console::Term;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on the first Ctrl+C; exit on the second.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stderr().is_term();
        if is_tty {
            eprintln!("\n\nAbort requested, keeping what was imported so far...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Abort requested, keeping what was imported so far");
        }

        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}
