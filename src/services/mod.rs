pub mod upstream;
pub mod validator;
