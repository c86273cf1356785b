//! prometheus-plugin standalone binary

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let exit_code = prometheus_plugin::run(args);
    std::process::exit(exit_code);
}
