mod app;
mod bridge;
mod player;
mod widgets;

use app::AppState;
use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    init_tracing();

    iced::application("Echo Viewer", AppState::update, AppState::view)
        .subscription(AppState::subscription)
        .run_with(AppState::boot)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
