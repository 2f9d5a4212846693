use std::sync::Arc;

use discussions::config::DiscussionLimits;
use discussions::error::DiscussionError;
use discussions::models::{CommentSort, EntityKey, EntityKind, MembershipTier, ThreadRef};
use discussions::services::discussion_service::DiscussionService;
use discussions::services::profile_service::InMemoryProfileDirectory;
use discussions::services::query_service::ListComments;
use discussions::store::InMemoryDiscussionStore;
use uuid::Uuid;

struct Fixture {
    service: DiscussionService,
    store: InMemoryDiscussionStore,
    directory: InMemoryProfileDirectory,
    story: EntityKey,
    moderator: Uuid,
}

async fn fixture_with(limits: DiscussionLimits) -> Fixture {
    let store = InMemoryDiscussionStore::new();
    let directory = InMemoryProfileDirectory::new();
    directory.add_profile("acme", true).await;
    let story_id = directory.add_story("hello-world", "acme").await;

    let moderator = Uuid::new_v4();
    directory
        .grant("acme", moderator, MembershipTier::Contributor)
        .await;

    let directory_handle = Arc::new(directory.clone());
    let service = DiscussionService::new(
        Arc::new(store.clone()),
        directory_handle.clone(),
        directory_handle.clone(),
        directory_handle,
        limits,
    );

    Fixture {
        service,
        store,
        directory,
        story: EntityKey::new(EntityKind::Story, story_id),
        moderator,
    }
}

async fn fixture() -> Fixture {
    fixture_with(DiscussionLimits::default()).await
}

fn top_level(include_hidden: bool, sort: CommentSort) -> ListComments {
    ListComments {
        include_hidden,
        sort,
        ..Default::default()
    }
}

#[tokio::test]
async fn first_comment_creates_the_thread() {
    let f = fixture().await;
    let author = Uuid::new_v4();

    let comment = f
        .service
        .create_comment(ThreadRef::Entity(f.story), author, None, "Nice post!")
        .await
        .unwrap();

    assert_eq!(comment.depth, 0);
    assert_eq!(comment.score, 0);
    assert!(comment.parent_id.is_none());

    let thread = f.service.get_or_create_thread(f.story).await.unwrap();
    assert_eq!(thread.id, comment.thread_id);
    assert!(!thread.is_locked);

    let (opened, entity) = f
        .service
        .open_discussion(EntityKind::Story, "hello-world")
        .await
        .unwrap();
    assert_eq!(opened.id, thread.id);
    assert_eq!(entity.profile_slug, "acme");
}

#[tokio::test]
async fn reply_sits_one_level_below_its_parent() {
    let f = fixture().await;
    let root = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "Nice post!")
        .await
        .unwrap();

    let reply = f
        .service
        .create_comment(
            ThreadRef::Thread(root.thread_id),
            Uuid::new_v4(),
            Some(root.id),
            "Agreed",
        )
        .await
        .unwrap();

    assert_eq!(reply.depth, 1);
    assert_eq!(reply.parent_id, Some(root.id));
    assert_eq!(reply.thread_id, root.thread_id);
}

#[tokio::test]
async fn votes_from_two_users_then_one_retracts() {
    let f = fixture().await;
    let comment = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "Nice post!")
        .await
        .unwrap();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    f.service.vote(comment.id, alice, 1).await.unwrap();
    let outcome = f.service.vote(comment.id, bob, 1).await.unwrap();
    assert_eq!(outcome.score, 2);

    let outcome = f.service.vote(comment.id, bob, 1).await.unwrap();
    assert_eq!(outcome.score, 1);
    assert!(outcome.viewer_direction.is_none());
    assert_eq!(f.store.vote_count(comment.id).await, 1);
}

#[tokio::test]
async fn switching_direction_moves_score_by_two() {
    let f = fixture().await;
    let comment = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "Nice post!")
        .await
        .unwrap();
    let voter = Uuid::new_v4();

    let up = f.service.vote(comment.id, voter, 1).await.unwrap();
    let down = f.service.vote(comment.id, voter, -1).await.unwrap();

    assert_eq!(down.score - up.score, -2);
    assert_eq!(f.store.vote_count(comment.id).await, 1);

    let err = f.service.vote(comment.id, voter, 0).await.unwrap_err();
    assert_eq!(err, DiscussionError::InvalidVoteDirection(0));
}

#[tokio::test]
async fn locked_thread_blocks_creation_but_keeps_listing() {
    let f = fixture().await;
    let author = Uuid::new_v4();
    let root = f
        .service
        .create_comment(ThreadRef::Entity(f.story), author, None, "Nice post!")
        .await
        .unwrap();

    let thread = f
        .service
        .lock_thread(root.thread_id, f.moderator, "acme", true)
        .await
        .unwrap();
    assert!(thread.is_locked);

    let top = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "Too late")
        .await
        .unwrap_err();
    assert_eq!(top, DiscussionError::ThreadLocked);

    let reply = f
        .service
        .create_comment(
            ThreadRef::Thread(thread.id),
            Uuid::new_v4(),
            Some(root.id),
            "Also too late",
        )
        .await
        .unwrap_err();
    assert_eq!(reply, DiscussionError::ThreadLocked);

    let listed = f
        .service
        .list_comments(thread.id, top_level(false, CommentSort::New))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let edited = f
        .service
        .edit_comment(root.id, author, "Nice post, edited while locked")
        .await
        .unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "Nice post, edited while locked");

    let voted = f.service.vote(root.id, Uuid::new_v4(), 1).await.unwrap();
    assert_eq!(voted.score, 1);

    f.service
        .lock_thread(thread.id, f.moderator, "acme", false)
        .await
        .unwrap();
    f.service
        .create_comment(ThreadRef::Thread(thread.id), Uuid::new_v4(), None, "Back open")
        .await
        .unwrap();
}

#[tokio::test]
async fn members_below_contributor_cannot_lock() {
    let f = fixture().await;
    let member = Uuid::new_v4();
    f.directory
        .grant("acme", member, MembershipTier::Member)
        .await;
    let thread = f.service.get_or_create_thread(f.story).await.unwrap();

    let err = f
        .service
        .lock_thread(thread.id, member, "acme", true)
        .await
        .unwrap_err();
    assert_eq!(err, DiscussionError::InsufficientPermission);
    assert!(!f.service.get_thread(thread.id).await.unwrap().is_locked);
}

#[tokio::test]
async fn content_bounds_are_enforced() {
    let f = fixture().await;
    let author = Uuid::new_v4();

    let short = f
        .service
        .create_comment(ThreadRef::Entity(f.story), author, None, "x")
        .await
        .unwrap_err();
    assert_eq!(short, DiscussionError::ContentTooShort { min: 2 });

    let long = "a".repeat(10_000);
    let err = f
        .service
        .create_comment(ThreadRef::Entity(f.story), author, None, &long)
        .await
        .unwrap_err();
    assert_eq!(err, DiscussionError::ContentTooLong { max: 5000 });
}

#[tokio::test]
async fn nesting_stops_at_the_configured_depth() {
    let limits = DiscussionLimits {
        max_depth: 3,
        ..DiscussionLimits::default()
    };
    let f = fixture_with(limits).await;
    let author = Uuid::new_v4();

    let mut parent = f
        .service
        .create_comment(ThreadRef::Entity(f.story), author, None, "depth 0")
        .await
        .unwrap();
    for depth in 1..=3 {
        let reply = f
            .service
            .create_comment(
                ThreadRef::Thread(parent.thread_id),
                author,
                Some(parent.id),
                &format!("depth {depth}"),
            )
            .await
            .unwrap();
        assert_eq!(reply.depth, parent.depth + 1);
        parent = reply;
    }

    let err = f
        .service
        .create_comment(
            ThreadRef::Thread(parent.thread_id),
            author,
            Some(parent.id),
            "one too deep",
        )
        .await
        .unwrap_err();
    assert_eq!(err, DiscussionError::MaxNestingDepth { max: 3 });
}

#[tokio::test]
async fn deleting_a_parent_keeps_its_replies_in_place() {
    let f = fixture().await;
    let author = Uuid::new_v4();
    let root = f
        .service
        .create_comment(ThreadRef::Entity(f.story), author, None, "parent")
        .await
        .unwrap();
    let reply = f
        .service
        .create_comment(
            ThreadRef::Thread(root.thread_id),
            Uuid::new_v4(),
            Some(root.id),
            "child",
        )
        .await
        .unwrap();

    f.service
        .delete_comment(root.id, author, "acme")
        .await
        .unwrap();

    let tombstone = f.service.get_comment(root.id, None, None).await.unwrap();
    assert!(tombstone.is_deleted);
    assert_eq!(tombstone.content, "[deleted]");

    let replies = f
        .service
        .list_comments(
            root.thread_id,
            ListComments {
                parent_id: Some(root.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id, reply.id);
    assert_eq!(replies[0].parent_id, Some(root.id));
}

#[tokio::test]
async fn equal_scores_list_oldest_first_every_time() {
    let f = fixture().await;
    let mut created = Vec::new();
    for content in ["first", "second", "third"] {
        let comment = f
            .service
            .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, content)
            .await
            .unwrap();
        created.push(comment.id);
    }
    let thread_id = f.service.get_or_create_thread(f.story).await.unwrap().id;

    for _ in 0..3 {
        let listed: Vec<Uuid> = f
            .service
            .list_comments(thread_id, top_level(false, CommentSort::Top))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed, created);
    }
}

#[tokio::test]
async fn hidden_comments_follow_include_hidden() {
    let f = fixture().await;
    let visible = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "visible")
        .await
        .unwrap();
    let hidden = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "hidden")
        .await
        .unwrap();

    let response = f
        .service
        .hide_comment(hidden.id, f.moderator, "acme", true)
        .await
        .unwrap();
    assert!(response.is_hidden);

    let public = f
        .service
        .list_comments(visible.thread_id, top_level(false, CommentSort::New))
        .await
        .unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].id, visible.id);

    let moderated = f
        .service
        .list_comments(visible.thread_id, top_level(true, CommentSort::New))
        .await
        .unwrap();
    assert_eq!(moderated.len(), 2);
}

#[tokio::test]
async fn pinned_comments_lead_the_hot_listing() {
    let f = fixture().await;
    let popular = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "popular")
        .await
        .unwrap();
    let announcement = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "announcement")
        .await
        .unwrap();
    f.service
        .vote(popular.id, Uuid::new_v4(), 1)
        .await
        .unwrap();

    f.service
        .pin_comment(announcement.id, f.moderator, "acme", true)
        .await
        .unwrap();
    // Replaying the same request leaves the pin in place.
    f.service
        .pin_comment(announcement.id, f.moderator, "acme", true)
        .await
        .unwrap();

    let listed = f
        .service
        .list_comments(popular.thread_id, top_level(false, CommentSort::Hot))
        .await
        .unwrap();
    assert_eq!(listed[0].id, announcement.id);
    assert!(listed[0].is_pinned);
    assert_eq!(listed[1].id, popular.id);
}

#[tokio::test]
async fn disabled_profiles_refuse_discussions() {
    let f = fixture().await;
    f.directory.set_discussions_enabled("acme", false).await;

    let err = f
        .service
        .open_discussion(EntityKind::Story, "hello-world")
        .await
        .unwrap_err();
    assert_eq!(err, DiscussionError::DiscussionsNotEnabled);

    let err = f
        .service
        .open_discussion(EntityKind::Story, "no-such-story")
        .await
        .unwrap_err();
    assert_eq!(err, DiscussionError::EntityNotFound);
}

#[tokio::test]
async fn listing_reports_the_viewers_own_vote() {
    let f = fixture().await;
    let comment = f
        .service
        .create_comment(ThreadRef::Entity(f.story), Uuid::new_v4(), None, "vote on me")
        .await
        .unwrap();
    let viewer = Uuid::new_v4();
    f.service.vote(comment.id, viewer, -1).await.unwrap();

    let listed = f
        .service
        .list_comments(
            comment.thread_id,
            ListComments {
                viewer_id: Some(viewer),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed[0].viewer_vote, Some(-1));

    let anonymous = f
        .service
        .list_comments(comment.thread_id, ListComments::default())
        .await
        .unwrap();
    assert_eq!(anonymous[0].viewer_vote, None);
}
