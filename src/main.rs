#[tokio::main]
async fn main() {
    if let Err(e) = appointment_scheduler::run().await {
        eprintln!("appointment-scheduler failed to start: {}", e);
        std::process::exit(1);
    }
}
