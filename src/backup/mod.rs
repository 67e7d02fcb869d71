mod db_dump;
mod db_list;
mod logic;

pub use logic::run_backup_phase;
