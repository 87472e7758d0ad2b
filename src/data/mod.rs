pub mod class;
pub mod code;
pub mod course;
pub mod room;
pub mod schedule;
pub mod student;
pub mod teacher;

pub(crate) fn true_bool() -> bool {
    true
}
