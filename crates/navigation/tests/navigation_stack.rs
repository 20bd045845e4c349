use async_trait::async_trait;
use dialog_navigation::{
    MemorySessionStore, NavigationError, NavigationStack, ScenarioData, SessionField, SessionKey,
    SessionLocks, SessionMap, SessionStore, SessionStoreError, StoreResult,
};
use dialog_protocol::{Command, KeyboardLayout, NavigationStep};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tokio::sync::Barrier;

const KEY: SessionKey = SessionKey::new(456, 789);

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

async fn seed(store: &MemorySessionStore, history: &[NavigationStep]) {
    let nav = NavigationStack::new(store, KEY);
    for step in history {
        nav.push(step.clone()).await.expect("push");
    }
}

fn step_strategy() -> impl Strategy<Value = NavigationStep> {
    (
        prop::sample::select(Command::ALL.to_vec()),
        prop::option::of(prop::sample::select(vec![
            KeyboardLayout::RolePicker,
            KeyboardLayout::SubmitterMenu,
            KeyboardLayout::ReviewerMenu,
        ])),
        prop::option::of("[a-z ]{1,12}"),
    )
        .prop_map(|(command, keyboard, text)| NavigationStep {
            command,
            keyboard,
            text,
        })
}

proptest! {
    #[test]
    fn proptest_pop_previous_on_short_history_is_noop(
        history in prop::collection::vec(step_strategy(), 0..2),
    ) {
        let rt = runtime();
        let (popped, after) = rt.block_on(async {
            let store = MemorySessionStore::new();
            seed(&store, &history).await;
            let nav = NavigationStack::new(&store, KEY);
            let popped = nav
                .pop_previous_with_defaults(Some(KeyboardLayout::AdminMenu), Some("default"))
                .await
                .unwrap();
            (popped, nav.history().await.unwrap())
        });
        prop_assert_eq!(popped, None);
        prop_assert_eq!(after, history);
    }

    #[test]
    fn proptest_pop_previous_drops_only_current_step(
        history in prop::collection::vec(step_strategy(), 2..10),
    ) {
        let rt = runtime();
        let (popped, after) = rt.block_on(async {
            let store = MemorySessionStore::new();
            seed(&store, &history).await;
            let nav = NavigationStack::new(&store, KEY);
            let popped = nav
                .pop_previous_with_defaults(Some(KeyboardLayout::AdminMenu), Some("default"))
                .await
                .unwrap();
            (popped, nav.history().await.unwrap())
        });

        let expected_history = history[..history.len() - 1].to_vec();
        let previous = expected_history.last().cloned().unwrap();
        let expected = NavigationStep {
            command: previous.command,
            keyboard: previous.keyboard.or(Some(KeyboardLayout::AdminMenu)),
            text: previous.text.clone().or_else(|| Some("default".to_string())),
        };
        prop_assert_eq!(after, expected_history);
        prop_assert_eq!(popped, Some(expected));
    }

    #[test]
    fn proptest_entry_point_resets_history(
        history in prop::collection::vec(step_strategy(), 0..10),
        entry in prop::sample::select(vec![
            Command::Start,
            Command::Role,
            Command::SubmitterRole,
            Command::ReviewerRole,
            Command::AdminPanel,
        ]),
    ) {
        let rt = runtime();
        let after = rt.block_on(async {
            let store = MemorySessionStore::new();
            seed(&store, &history).await;
            let nav = NavigationStack::new(&store, KEY);
            nav.register_step(entry, Some(KeyboardLayout::RolePicker), None).await.unwrap();
            nav.history().await.unwrap()
        });
        prop_assert_eq!(
            after,
            vec![NavigationStep::new(entry).keyboard(KeyboardLayout::RolePicker)]
        );
    }

    #[test]
    fn proptest_rewind_truncates_at_last_occurrence(
        history in prop::collection::vec(step_strategy(), 0..12),
        target in prop::sample::select(Command::ALL.to_vec()),
    ) {
        let rt = runtime();
        let (found, after) = rt.block_on(async {
            let store = MemorySessionStore::new();
            seed(&store, &history).await;
            let nav = NavigationStack::new(&store, KEY);
            let found = nav.rewind_history_to(target).await.unwrap();
            (found, nav.history().await.unwrap())
        });

        match history.iter().rposition(|step| step.command == target) {
            Some(last) => {
                prop_assert!(found);
                prop_assert_eq!(after, history[..=last].to_vec());
            }
            None => {
                prop_assert!(!found);
                prop_assert_eq!(after, history);
            }
        }
    }
}

#[tokio::test]
async fn non_entry_steps_append() {
    let store = MemorySessionStore::new();
    let nav = NavigationStack::new(&store, KEY);

    nav.register_step(Command::Start, Some(KeyboardLayout::RolePicker), None)
        .await
        .unwrap();
    nav.register_step(Command::Help, None, Some("help".to_string()))
        .await
        .unwrap();

    assert_eq!(
        nav.history().await.unwrap(),
        vec![
            NavigationStep::new(Command::Start).keyboard(KeyboardLayout::RolePicker),
            NavigationStep::new(Command::Help).text("help"),
        ]
    );
}

#[tokio::test]
async fn register_entry_point_is_idempotent() {
    let store = MemorySessionStore::new();
    let nav = NavigationStack::new(&store, KEY);
    nav.register_step(Command::Help, None, None).await.unwrap();

    nav.register_entry_point().await.unwrap();
    nav.register_entry_point().await.unwrap();
    assert!(nav.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn anchor_accessors() {
    let store = MemorySessionStore::new();
    let nav = NavigationStack::new(&store, KEY);
    let anchor = NavigationStep::new(Command::ReviewerRole).keyboard(KeyboardLayout::ReviewerMenu);

    nav.set_cancel_anchor(Some(anchor.clone())).await.unwrap();
    assert_eq!(nav.cancel_anchor().await.unwrap(), Some(anchor));

    nav.set_cancel_anchor(None).await.unwrap();
    assert_eq!(nav.cancel_anchor().await.unwrap(), None);

    nav.set_cancel_anchor(Some(NavigationStep::new(Command::Start)))
        .await
        .unwrap();
    nav.clear_cancel_anchor().await.unwrap();
    assert_eq!(nav.cancel_anchor().await.unwrap(), None);
}

#[tokio::test]
async fn anchor_rewind_prunes_child_steps() {
    let store = MemorySessionStore::new();
    let nav = NavigationStack::new(&store, KEY);

    nav.register_step(Command::ReviewerRole, Some(KeyboardLayout::ReviewerMenu), None)
        .await
        .unwrap();
    let anchor = nav.peek().await.unwrap().unwrap();
    nav.set_cancel_anchor(Some(anchor.clone())).await.unwrap();
    nav.register_step(Command::ReviewerTaskCreate, None, None)
        .await
        .unwrap();
    nav.register_step(Command::ReviewerTaskDescription, None, None)
        .await
        .unwrap();

    assert!(nav.rewind_history_to(anchor.command).await.unwrap());
    nav.clear_cancel_anchor().await.unwrap();

    assert_eq!(nav.history().await.unwrap(), vec![anchor.clone()]);
    assert_eq!(nav.peek().await.unwrap(), Some(anchor));
}

#[tokio::test]
async fn clear_scenario_keeps_navigation_only() {
    let store = MemorySessionStore::new();
    let nav = NavigationStack::new(&store, KEY);
    let data = ScenarioData::new(&store, KEY);

    nav.register_step(Command::Start, None, None).await.unwrap();
    nav.register_step(Command::ReviewerTaskCreate, None, None)
        .await
        .unwrap();
    nav.set_cancel_anchor(Some(NavigationStep::new(Command::Start)))
        .await
        .unwrap();
    nav.set_mode(Some("task_create:title")).await.unwrap();
    data.set("title", "Draft").await.unwrap();

    let before = nav.navigation_state().await.unwrap();
    nav.clear_scenario_keep_history().await.unwrap();

    assert_eq!(nav.navigation_state().await.unwrap(), before);
    assert_eq!(nav.mode().await.unwrap(), None);
    assert_eq!(data.get::<String>("title").await.unwrap(), None);
}

#[tokio::test]
async fn clear_scenario_without_anchor_does_not_invent_one() {
    let store = MemorySessionStore::new();
    let nav = NavigationStack::new(&store, KEY);
    nav.register_step(Command::Start, None, None).await.unwrap();

    nav.clear_scenario_keep_history().await.unwrap();

    assert_eq!(nav.cancel_anchor().await.unwrap(), None);
    assert_eq!(nav.history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn clear_mode_keeps_exactly_navigation_fields() {
    let store = MemorySessionStore::new();
    let nav = NavigationStack::new(&store, KEY);
    let data = ScenarioData::new(&store, KEY);

    nav.register_step(Command::SubmitterRole, None, None)
        .await
        .unwrap();
    nav.set_cancel_anchor(Some(NavigationStep::new(Command::SubmitterRole)))
        .await
        .unwrap();
    nav.set_mode(Some("submitter_answer")).await.unwrap();
    data.set("answer", "42").await.unwrap();
    data.set("nav:history", "sneaky").await.unwrap();

    nav.clear_mode_keep_navigation().await.unwrap();

    let fields: Vec<SessionField> = store.get_all(&KEY).await.unwrap().into_keys().collect();
    assert_eq!(fields, vec![SessionField::History, SessionField::CancelAnchor]);
    assert_eq!(nav.history().await.unwrap().len(), 1);
}

/// Store that lets two read-modify-write cycles interleave deterministically.
struct InterleavingStore {
    inner: MemorySessionStore,
    barrier: Option<Barrier>,
}

#[async_trait]
impl SessionStore for InterleavingStore {
    async fn get(&self, key: &SessionKey, field: &SessionField) -> StoreResult<Option<Vec<u8>>> {
        let value = self.inner.get(key, field).await?;
        if *field == SessionField::History {
            match &self.barrier {
                Some(barrier) => {
                    barrier.wait().await;
                }
                None => tokio::task::yield_now().await,
            }
        }
        Ok(value)
    }

    async fn set(&self, key: &SessionKey, field: &SessionField, value: Vec<u8>) -> StoreResult<()> {
        self.inner.set(key, field, value).await
    }

    async fn delete(&self, key: &SessionKey, field: &SessionField) -> StoreResult<()> {
        self.inner.delete(key, field).await
    }

    async fn get_all(&self, key: &SessionKey) -> StoreResult<SessionMap> {
        self.inner.get_all(key).await
    }

    async fn set_all(&self, key: &SessionKey, data: SessionMap) -> StoreResult<()> {
        self.inner.set_all(key, data).await
    }

    async fn clear(&self, key: &SessionKey) -> StoreResult<()> {
        self.inner.clear(key).await
    }
}

#[tokio::test]
async fn concurrent_events_without_lock_lose_an_update() {
    let inner = MemorySessionStore::new();
    seed(&inner, &[NavigationStep::new(Command::Start)]).await;
    let store = InterleavingStore {
        inner,
        barrier: Some(Barrier::new(2)),
    };
    let nav = NavigationStack::new(&store, KEY);

    let (a, b) = tokio::join!(
        nav.push(NavigationStep::new(Command::SubmitterTasks)),
        nav.push(NavigationStep::new(Command::Help)),
    );
    a.unwrap();
    b.unwrap();

    // Both cycles read [Start]; the later write clobbers the earlier one.
    let commands: Vec<Command> = NavigationStack::new(&store.inner, KEY)
        .history()
        .await
        .unwrap()
        .into_iter()
        .map(|step| step.command)
        .collect();
    assert!(
        commands == vec![Command::Start, Command::SubmitterTasks]
            || commands == vec![Command::Start, Command::Help],
        "unexpected history {commands:?}"
    );
}

#[tokio::test]
async fn session_lock_serializes_concurrent_events() {
    let inner = MemorySessionStore::new();
    seed(&inner, &[NavigationStep::new(Command::Start)]).await;
    let store = InterleavingStore {
        inner,
        barrier: None,
    };
    let locks = SessionLocks::new();
    let nav = NavigationStack::new(&store, KEY);

    let event = |step: NavigationStep| {
        let locks = &locks;
        async move {
            let _lease = locks.acquire(KEY).await;
            nav.push(step).await
        }
    };
    let (a, b) = tokio::join!(
        event(NavigationStep::new(Command::SubmitterTasks)),
        event(NavigationStep::new(Command::Help)),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(nav.history().await.unwrap().len(), 3);
}

struct UnavailableStore;

#[async_trait]
impl SessionStore for UnavailableStore {
    async fn get(&self, _: &SessionKey, _: &SessionField) -> StoreResult<Option<Vec<u8>>> {
        Err(SessionStoreError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _: &SessionKey, _: &SessionField, _: Vec<u8>) -> StoreResult<()> {
        Err(SessionStoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _: &SessionKey, _: &SessionField) -> StoreResult<()> {
        Err(SessionStoreError::Unavailable("connection refused".to_string()))
    }

    async fn get_all(&self, _: &SessionKey) -> StoreResult<SessionMap> {
        Err(SessionStoreError::Unavailable("connection refused".to_string()))
    }

    async fn set_all(&self, _: &SessionKey, _: SessionMap) -> StoreResult<()> {
        Err(SessionStoreError::Unavailable("connection refused".to_string()))
    }

    async fn clear(&self, _: &SessionKey) -> StoreResult<()> {
        Err(SessionStoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn store_failures_propagate_unchanged() {
    let store = UnavailableStore;
    let nav = NavigationStack::new(&store, KEY);

    let err = nav
        .register_step(Command::Help, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NavigationError::Store(SessionStoreError::Unavailable(_))
    ));
    assert!(nav.pop_previous_with_defaults(None, None).await.is_err());
    assert!(nav.clear_scenario_keep_history().await.is_err());
    assert!(nav.clear_mode_keep_navigation().await.is_err());
}

/// Store that can wipe a session but rejects every other write.
struct WipeOnlyStore {
    inner: MemorySessionStore,
}

#[async_trait]
impl SessionStore for WipeOnlyStore {
    async fn get(&self, key: &SessionKey, field: &SessionField) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key, field).await
    }

    async fn set(&self, _: &SessionKey, _: &SessionField, _: Vec<u8>) -> StoreResult<()> {
        Err(SessionStoreError::Unavailable("read only".to_string()))
    }

    async fn delete(&self, _: &SessionKey, _: &SessionField) -> StoreResult<()> {
        Err(SessionStoreError::Unavailable("read only".to_string()))
    }

    async fn get_all(&self, key: &SessionKey) -> StoreResult<SessionMap> {
        self.inner.get_all(key).await
    }

    async fn set_all(&self, _: &SessionKey, _: SessionMap) -> StoreResult<()> {
        Err(SessionStoreError::Unavailable("read only".to_string()))
    }

    async fn clear(&self, key: &SessionKey) -> StoreResult<()> {
        self.inner.clear(key).await
    }
}

#[tokio::test]
async fn failed_scenario_clear_keeps_navigation() {
    let inner = MemorySessionStore::new();
    seed(
        &inner,
        &[
            NavigationStep::new(Command::ReviewerRole),
            NavigationStep::new(Command::ReviewerTaskCreate),
        ],
    )
    .await;
    NavigationStack::new(&inner, KEY)
        .set_cancel_anchor(Some(NavigationStep::new(Command::ReviewerRole)))
        .await
        .unwrap();
    let store = WipeOnlyStore { inner };

    let nav = NavigationStack::new(&store, KEY);
    assert!(nav.clear_scenario_keep_history().await.is_err());

    assert_eq!(nav.history().await.unwrap().len(), 2);
    assert_eq!(
        nav.cancel_anchor().await.unwrap(),
        Some(NavigationStep::new(Command::ReviewerRole))
    );
}
