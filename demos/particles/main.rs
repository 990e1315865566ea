use ripple::demos::ParticlesDemo;

fn main() {
    env_logger::init();
    ripple::launch("Particles", ParticlesDemo::new).run();
}
