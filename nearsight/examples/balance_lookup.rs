use log::LevelFilter;
use nearsight::controller::BalanceController;
use nearsight::settings::Settings;
use nearsight::utils::setup_logger;
use std::env;

#[tokio::main]
async fn main() {
    let _ = setup_logger(Some(LevelFilter::Info));
    let account = env::args().nth(1).unwrap_or_else(|| String::from("near"));

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("using built-in settings: {}", e);
        Settings::default()
    });
    let mut controller = BalanceController::from_settings(&settings).expect("Failed to build rpc client");

    let handle = match controller.submit(&account) {
        Ok(handle) => handle,
        Err(message) => {
            eprintln!("{}", message);
            return;
        }
    };
    let status = handle.wait().await;

    let state = controller.state();
    println!("request {} finished: {:?}", state.request_id(), status);
    match (state.balance, state.error) {
        (Some(balance), _) => {
            println!("available: {} NEAR", balance.available);
            println!("staked:    {} NEAR", balance.staked);
            println!("total:     {} NEAR", balance.total);
        }
        (None, Some(error)) => eprintln!("{}", error),
        (None, None) => {}
    }
}
