pub mod args;
pub mod extract;
pub mod print_completions;
pub mod probe;

pub use extract::extract;
pub use print_completions::print_completions;
pub use probe::probe;

const PROGRESS_CHARS: &str = "##-";
