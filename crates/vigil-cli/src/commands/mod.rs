pub mod run_script;
pub mod sample;
pub mod serve;
pub mod test_email;

pub use run_script::RunScriptCommand;
pub use sample::SampleCommand;
pub use serve::ServeCommand;
pub use test_email::TestEmailCommand;
