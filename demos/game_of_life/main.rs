use ripple::demos::LifeDemo;

fn main() {
    env_logger::init();
    ripple::launch("Game of Life", LifeDemo::new).run();
}
