pub mod credentials;
pub mod csv_io;
pub mod locallogic;
pub mod pacer;
pub mod xlsx_input;
