// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging and hand argv to the dispatcher.
// - Diagnostics go through `log`; enable them with `RUST_LOG=debug`.

fn main() {
    env_logger::init();
    let code = factorio_mod_release::cli::run(std::env::args_os());
    std::process::exit(code);
}
