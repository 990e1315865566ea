use ripple::demos::ClothDemo;

fn main() {
    env_logger::init();
    ripple::launch("Cloth", ClothDemo::new).run();
}
