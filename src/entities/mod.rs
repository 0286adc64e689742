pub mod courses;
pub mod enrollments;
pub mod learning_path_courses;
pub mod learning_paths;
pub mod orders;
pub mod transactions;

pub use courses as course_entity;
pub use enrollments as enrollment_entity;
pub use learning_path_courses as path_course_entity;
pub use learning_paths as learning_path_entity;
pub use orders as order_entity;
pub use transactions as transaction_entity;

pub use enrollments::EnrollmentStatus;
pub use orders::{MONEY_SCALE, OrderStatus, OrderTarget};
pub use transactions::TransactionStatus;
