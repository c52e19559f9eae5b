use RootSolve::Examples::rootsolve_examples::rootsolve_examples;
use RootSolve::Utils::logger::init_logger;
use log::LevelFilter;

pub fn main() {
    if let Err(e) = init_logger(LevelFilter::Info, None) {
        eprintln!("logger was not initialized: {}", e);
    }
    //
    let task: usize = 1;
    rootsolve_examples(task);
}
