fn main() -> std::process::ExitCode {
    oauth_token_bridge_lib::run()
}
