use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(err) = chipview::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
