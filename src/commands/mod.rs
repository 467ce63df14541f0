pub mod two_up;
