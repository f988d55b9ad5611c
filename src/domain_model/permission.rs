//! Permission strings have the form `<resource>:<action>`. A held permission
//! `<prefix>:*` grants every permission that starts with `<prefix>:`.

pub mod user {
    pub const VIEW: &str = "user:view";
    pub const CREATE: &str = "user:create";
    pub const EDIT: &str = "user:edit";
    pub const DELETE: &str = "user:delete";
    pub const EXPORT: &str = "user:export";
    pub const IMPERSONATE: &str = "user:impersonate";
}

pub mod product {
    pub const VIEW: &str = "product:view";
    pub const CREATE: &str = "product:create";
    pub const EDIT: &str = "product:edit";
    pub const DELETE: &str = "product:delete";
    pub const PUBLISH: &str = "product:publish";
    pub const ARCHIVE: &str = "product:archive";
}

pub mod order {
    pub const VIEW: &str = "order:view";
    pub const CREATE: &str = "order:create";
    pub const EDIT: &str = "order:edit";
    pub const DELETE: &str = "order:delete";
    pub const CANCEL: &str = "order:cancel";
    pub const APPROVE: &str = "order:approve";
    pub const EXPORT: &str = "order:export";
}

pub mod analytics {
    pub const VIEW: &str = "analytics:view";
    pub const EXPORT: &str = "analytics:export";
    pub const MANAGE: &str = "analytics:manage";
}

pub mod settings {
    pub const VIEW: &str = "settings:view";
    pub const EDIT: &str = "settings:edit";
    pub const MANAGE: &str = "settings:manage";
}

pub mod system {
    pub const LOGS_VIEW: &str = "system:logs:view";
    pub const CONFIG_VIEW: &str = "system:config:view";
    pub const CONFIG_EDIT: &str = "system:config:edit";
    pub const BACKUP: &str = "system:backup";
    pub const RESTORE: &str = "system:restore";
}

/// Every permission the application defines.
pub const ALL: &[&str] = &[
    user::VIEW,
    user::CREATE,
    user::EDIT,
    user::DELETE,
    user::EXPORT,
    user::IMPERSONATE,
    product::VIEW,
    product::CREATE,
    product::EDIT,
    product::DELETE,
    product::PUBLISH,
    product::ARCHIVE,
    order::VIEW,
    order::CREATE,
    order::EDIT,
    order::DELETE,
    order::CANCEL,
    order::APPROVE,
    order::EXPORT,
    analytics::VIEW,
    analytics::EXPORT,
    analytics::MANAGE,
    settings::VIEW,
    settings::EDIT,
    settings::MANAGE,
    system::LOGS_VIEW,
    system::CONFIG_VIEW,
    system::CONFIG_EDIT,
    system::BACKUP,
    system::RESTORE,
];

pub fn resource_action(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

pub fn wildcard(resource: &str) -> String {
    format!("{}:*", resource)
}

/// Does a single held permission grant `required`?
pub fn grants(held: &str, required: &str) -> bool {
    if held == required {
        return true;
    }
    match held.strip_suffix(":*") {
        Some(prefix) if !prefix.is_empty() => required
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(':')),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_grants_every_action_of_its_resource() {
        assert!(grants("order:*", "order:view"));
        assert!(grants("order:*", "order:delete"));
        assert!(grants("system:*", "system:logs:view"));
        assert!(!grants("order:*", "orders:view"));
        assert!(!grants("order:*", "product:view"));
        assert!(!grants(":*", "order:view"));
    }

    #[test]
    fn exact_match_is_required_otherwise() {
        assert!(grants("order:view", "order:view"));
        assert!(!grants("order:view", "order:edit"));
    }

    #[test]
    fn derived_strings() {
        assert_eq!(resource_action("order", "view"), order::VIEW);
        assert_eq!(wildcard("order"), "order:*");
    }
}
