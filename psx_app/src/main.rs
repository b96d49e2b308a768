mod app;
mod error;

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = app::App::start() {
        panic!("The app failed: {:?}", e);
    }
}
