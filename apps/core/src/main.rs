fn main() {
    let options = match quickpick_core::runtime::parse_cli_args(std::env::args_os()) {
        Ok(options) => options,
        Err(error) => error.exit(),
    };

    if let Err(error) = quickpick_core::runtime::run_with_options(options) {
        eprintln!("[quickpick] runtime failed: {error}");
        std::process::exit(1);
    }
}
