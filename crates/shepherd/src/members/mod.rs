//! Member registration, credentials, departments and the active directory.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{
    Department, DepartmentId, Member, MemberCredentials, MemberId, NewDepartment,
    RegistrationRequest, Role, UnknownRole,
};
pub use repository::MemberRepository;
pub use router::member_router;
pub use service::{MemberService, MemberServiceError};
