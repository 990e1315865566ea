use ripple::demos::TrafficDemo;

fn main() {
    env_logger::init();
    ripple::launch("Traffic", TrafficDemo::new).run();
}
