use chrono::Utc;
use pixkeys::domain::account::{AccountId, BankAccount};
use pixkeys::domain::pix_key::{KeyDescriptor, PixKey, PixKeyKind};
use pixkeys::domain::ports::{BankAccountLookupBox, DirectoryClientBox, LocalKeyStoreBox};
use pixkeys::infrastructure::in_memory::{
    InMemoryBankAccounts, InMemoryDirectory, InMemoryPixKeyStore,
};

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let account = AccountId::new();
    let lookup: BankAccountLookupBox =
        Box::new(InMemoryBankAccounts::with_accounts([BankAccount::new(account)]));
    let directory: DirectoryClientBox = Box::new(InMemoryDirectory::new());
    let store: LocalKeyStoreBox = Box::new(InMemoryPixKeyStore::new());

    // Verify Send + Sync by spawning tasks
    let lookup_handle = tokio::spawn(async move { lookup.resolve(account).await.unwrap() });

    let directory_handle = tokio::spawn(async move {
        let descriptor = KeyDescriptor::new("12345678901", PixKeyKind::Document).unwrap();
        directory.register(&descriptor, account).await.unwrap()
    });

    let store_handle = tokio::spawn(async move {
        let pix_key = PixKey {
            id: "remote-1".into(),
            key: "a@b.co".into(),
            kind: PixKeyKind::Email,
            account_id: account,
            created_at: Utc::now(),
        };
        store.insert(pix_key).await.unwrap();
        store.exists("a@b.co").await.unwrap()
    });

    assert_eq!(lookup_handle.await.unwrap().map(|a| a.id), Some(account));
    assert_eq!(directory_handle.await.unwrap().account_id, account);
    assert!(store_handle.await.unwrap());
}
