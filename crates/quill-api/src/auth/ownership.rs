//! Ownership policy for mutating owned resources
//!
//! A caller may mutate a resource it authored, or any resource when its role
//! is in the override set the call site supplies. Pure, no I/O; callers turn
//! `false` into a forbidden response.

use super::jwt::IdentityClaim;
use super::middleware::RequestIdentity;
use quill_core::{Post, Role, RoleSet, UserAccount};
use uuid::Uuid;

/// Roles that may edit posts they did not write
pub const EDIT_OVERRIDE: RoleSet = RoleSet::EMPTY;

/// Roles that may delete posts they did not write
pub const DELETE_OVERRIDE: RoleSet = RoleSet::only(Role::Admin);

/// Someone acting on a resource
pub trait Actor {
    fn actor_id(&self) -> Uuid;
    fn actor_role(&self) -> Role;
}

/// A resource with exactly one author, fixed at creation
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Actor for UserAccount {
    fn actor_id(&self) -> Uuid {
        self.id
    }

    fn actor_role(&self) -> Role {
        self.role
    }
}

impl Actor for RequestIdentity {
    fn actor_id(&self) -> Uuid {
        self.account_id
    }

    fn actor_role(&self) -> Role {
        self.account.role
    }
}

impl Actor for IdentityClaim {
    fn actor_id(&self) -> Uuid {
        self.user_id
    }

    fn actor_role(&self) -> Role {
        self.role
    }
}

impl Owned for Post {
    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

/// True iff `actor` authored `resource` or holds a role in `override_roles`
pub fn can_mutate<A, R>(actor: &A, resource: &R, override_roles: RoleSet) -> bool
where
    A: Actor + ?Sized,
    R: Owned + ?Sized,
{
    actor.actor_id() == resource.owner_id() || override_roles.contains(actor.actor_role())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Doc(Uuid);

    impl Owned for Doc {
        fn owner_id(&self) -> Uuid {
            self.0
        }
    }

    fn identity(role: Role) -> IdentityClaim {
        IdentityClaim {
            user_id: Uuid::new_v4(),
            username: "someone".to_string(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn role_set_strategy() -> impl Strategy<Value = RoleSet> {
        prop::collection::vec(role_strategy(), 0..3).prop_map(|roles| roles.into_iter().collect())
    }

    #[test]
    fn test_author_and_admin_scenario() {
        let a = identity(Role::User);
        let post = Doc(a.user_id);

        assert!(can_mutate(&a, &post, RoleSet::EMPTY));

        let mut b = identity(Role::User);
        assert!(!can_mutate(&b, &post, RoleSet::EMPTY));
        assert!(!can_mutate(&b, &post, RoleSet::only(Role::Admin)));

        b.role = Role::Admin;
        assert!(can_mutate(&b, &post, RoleSet::only(Role::Admin)));
    }

    #[test]
    fn test_post_policies() {
        let author = UserAccount::new("author".into(), "a@example.com".into(), "h".into());
        let admin = UserAccount::new("admin".into(), "b@example.com".into(), "h".into())
            .with_role(Role::Admin);
        let moderator = UserAccount::new("mod".into(), "c@example.com".into(), "h".into())
            .with_role(Role::Moderator);
        let post = Post::new(author.id, Default::default());

        assert!(can_mutate(&author, &post, EDIT_OVERRIDE));
        assert!(can_mutate(&author, &post, DELETE_OVERRIDE));

        assert!(!can_mutate(&admin, &post, EDIT_OVERRIDE));
        assert!(can_mutate(&admin, &post, DELETE_OVERRIDE));

        assert!(!can_mutate(&moderator, &post, EDIT_OVERRIDE));
        assert!(!can_mutate(&moderator, &post, DELETE_OVERRIDE));
    }

    proptest! {
        #[test]
        fn author_always_allowed(role in role_strategy(), overrides in role_set_strategy()) {
            let actor = identity(role);
            let doc = Doc(actor.user_id);
            prop_assert!(can_mutate(&actor, &doc, overrides));
        }

        #[test]
        fn non_author_allowed_only_by_override(
            role in role_strategy(),
            overrides in role_set_strategy(),
        ) {
            let actor = identity(role);
            let doc = Doc(Uuid::new_v4());
            prop_assert_eq!(can_mutate(&actor, &doc, overrides), overrides.contains(role));
        }
    }
}
