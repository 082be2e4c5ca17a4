//! Integration tests for role and policy repositories, including the
//! policy-to-role assignment edge.

use uuid::Uuid;
use vigil_core::error::VigilError;
use vigil_core::models::policy::CreatePolicy;
use vigil_core::models::role::CreateRole;
use vigil_core::models::service::CreateService;
use vigil_core::repository::{
    Pagination, PolicyRepository, RoleRepository, ServiceRepository,
};
use vigil_db::repository::{
    SurrealPolicyRepository, SurrealRoleRepository, SurrealServiceRepository,
};

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB, run migrations, create a service.
async fn setup() -> (
    Surreal<surrealdb::engine::local::Db>,
    Uuid, // service_id
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();

    let service_repo = SurrealServiceRepository::new(db.clone());
    let service = service_repo
        .create(CreateService {
            name: "Company".into(),
            description: "Company management".into(),
        })
        .await
        .unwrap();

    (db, service.id)
}

#[tokio::test]
async fn create_and_get_role() {
    let (db, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    let role = repo
        .create(CreateRole {
            name: "Manager".into(),
            description: "Tenant manager".into(),
        })
        .await
        .unwrap();

    let by_id = repo.get_by_id(role.id).await.unwrap();
    assert_eq!(by_id.name, "Manager");

    let by_name = repo.get_by_name("Manager").await.unwrap();
    assert_eq!(by_name.id, role.id);
    assert!(by_name.has_tenant_override());
}

#[tokio::test]
async fn duplicate_role_name_rejected() {
    let (db, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    repo.create(CreateRole {
        name: "Administrator".into(),
        description: String::new(),
    })
    .await
    .unwrap();

    let result = repo
        .create(CreateRole {
            name: "Administrator".into(),
            description: "again".into(),
        })
        .await;

    assert!(matches!(result, Err(VigilError::Conflict { .. })));
}

#[tokio::test]
async fn list_roles() {
    let (db, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    for name in ["Administrator", "Manager", "CompanyCommon"] {
        repo.create(CreateRole {
            name: name.into(),
            description: String::new(),
        })
        .await
        .unwrap();
    }

    let page = repo.list(Pagination::default()).await.unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn get_service_by_name() {
    let (db, service_id) = setup().await;
    let repo = SurrealServiceRepository::new(db);

    let service = repo.get_by_name("Company").await.unwrap();
    assert_eq!(service.id, service_id);

    let missing = repo.get_by_name("Nonexistent").await;
    assert!(matches!(missing, Err(VigilError::NotFound { .. })));
}

#[tokio::test]
async fn create_and_lookup_policy() {
    let (db, service_id) = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let policy = repo
        .create(CreatePolicy {
            service_id,
            action: "GetCompany".into(),
            immutable: false,
        })
        .await
        .unwrap();

    let fetched = repo
        .get_by_service_action(service_id, "GetCompany")
        .await
        .unwrap();
    assert_eq!(fetched.id, policy.id);

    let missing = repo.get_by_service_action(service_id, "DeleteCompany").await;
    assert!(matches!(missing, Err(VigilError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_service_action_pair_rejected() {
    let (db, service_id) = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    repo.create(CreatePolicy {
        service_id,
        action: "GetCompany".into(),
        immutable: false,
    })
    .await
    .unwrap();

    let result = repo
        .create(CreatePolicy {
            service_id,
            action: "GetCompany".into(),
            immutable: false,
        })
        .await;

    assert!(matches!(result, Err(VigilError::Conflict { .. })));
}

#[tokio::test]
async fn assign_and_unassign_policy() {
    let (db, service_id) = setup().await;
    let policy_repo = SurrealPolicyRepository::new(db.clone());
    let role_repo = SurrealRoleRepository::new(db);

    let role = role_repo
        .create(CreateRole {
            name: "Manager".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let policy = policy_repo
        .create(CreatePolicy {
            service_id,
            action: "GetCompany".into(),
            immutable: false,
        })
        .await
        .unwrap();

    assert!(!policy_repo.is_assigned_to_role(policy.id, role.id).await.unwrap());

    policy_repo.assign_to_role(policy.id, role.id).await.unwrap();
    assert!(policy_repo.is_assigned_to_role(policy.id, role.id).await.unwrap());

    let listed = policy_repo.list_for_role(role.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, policy.id);

    policy_repo.unassign_from_role(policy.id, role.id).await.unwrap();
    assert!(!policy_repo.is_assigned_to_role(policy.id, role.id).await.unwrap());
    assert!(policy_repo.list_for_role(role.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn immutable_policy_rejects_update_and_delete() {
    let (db, service_id) = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let policy = repo
        .create(CreatePolicy {
            service_id,
            action: "GetCompany".into(),
            immutable: true,
        })
        .await
        .unwrap();

    let update = repo.update_action(policy.id, "Renamed").await;
    assert!(matches!(update, Err(VigilError::Forbidden { .. })));

    let delete = repo.delete(policy.id).await;
    assert!(matches!(delete, Err(VigilError::Forbidden { .. })));

    // The row survives untouched.
    let fetched = repo.get_by_id(policy.id).await.unwrap();
    assert_eq!(fetched.action, "GetCompany");
}

#[tokio::test]
async fn mutable_policy_can_be_renamed_and_deleted() {
    let (db, service_id) = setup().await;
    let policy_repo = SurrealPolicyRepository::new(db.clone());
    let role_repo = SurrealRoleRepository::new(db);

    let role = role_repo
        .create(CreateRole {
            name: "CompanyCommon".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let policy = policy_repo
        .create(CreatePolicy {
            service_id,
            action: "GetCompany".into(),
            immutable: false,
        })
        .await
        .unwrap();
    policy_repo.assign_to_role(policy.id, role.id).await.unwrap();

    let renamed = policy_repo.update_action(policy.id, "ReadCompany").await.unwrap();
    assert_eq!(renamed.action, "ReadCompany");

    policy_repo.delete(policy.id).await.unwrap();
    let gone = policy_repo.get_by_id(policy.id).await;
    assert!(matches!(gone, Err(VigilError::NotFound { .. })));

    // Assignment edges go with the policy.
    assert!(policy_repo.list_for_role(role.id).await.unwrap().is_empty());
}
