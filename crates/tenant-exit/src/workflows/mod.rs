pub mod moveout;
