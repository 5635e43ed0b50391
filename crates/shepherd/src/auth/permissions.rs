use crate::members::Role;

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Check in someone other than yourself.
    RecordAttendanceForOthers,
    /// Service-wide attendance and absentee lists.
    ViewServiceAttendance,
    /// Another member's attendance, tithes or receipts.
    ViewMemberRecords,
    RecordTitheForOthers,
    ManageMembers,
    ManageDepartments,
    RunJobs,
}

impl Role {
    pub fn allows(self, permission: Permission) -> bool {
        match self {
            Role::SuperAdmin | Role::Admin => true,
            Role::Pastor => match permission {
                Permission::RecordAttendanceForOthers
                | Permission::ViewServiceAttendance
                | Permission::ViewMemberRecords
                | Permission::RecordTitheForOthers => true,
                Permission::ManageMembers | Permission::ManageDepartments | Permission::RunJobs => {
                    false
                }
            },
            Role::HeadOfDepartment => match permission {
                Permission::RecordAttendanceForOthers | Permission::ViewServiceAttendance => true,
                Permission::ViewMemberRecords
                | Permission::RecordTitheForOthers
                | Permission::ManageMembers
                | Permission::ManageDepartments
                | Permission::RunJobs => false,
            },
            Role::Worker => match permission {
                Permission::RecordAttendanceForOthers => true,
                Permission::ViewServiceAttendance
                | Permission::ViewMemberRecords
                | Permission::RecordTitheForOthers
                | Permission::ManageMembers
                | Permission::ManageDepartments
                | Permission::RunJobs => false,
            },
            Role::CellLeader | Role::Member | Role::BookshopManager => false,
        }
    }
}
