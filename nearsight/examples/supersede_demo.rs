use log::LevelFilter;
use nearsight::controller::BalanceController;
use nearsight::settings::{Network, Settings};
use nearsight::utils::setup_logger;

#[tokio::main]
async fn main() {
    let _ = setup_logger(Some(LevelFilter::Debug));
    let settings = Settings::for_network(Network::Mainnet);
    let mut controller = BalanceController::from_settings(&settings).unwrap();
    let mut rx = controller.subscribe();

    // the second submit cancels the first before it can show anything
    let first = controller.submit("near").unwrap();
    let second = controller.submit("aurora.near").unwrap();

    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        println!("{:?}", state);
        if state.status.is_terminal() {
            break;
        }
    }
    println!("first: {:?}, second: {:?}", first.wait().await, second.wait().await);
}
