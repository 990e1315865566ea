use ripple::demos::FractalDemo;

fn main() {
    env_logger::init();
    ripple::launch("Fractal", FractalDemo::new).run();
}
