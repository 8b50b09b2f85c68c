use proptest::prelude::*;

use feedstore::db::MemoryBackend;
use feedstore::identity::{derive_article_identity, derive_source_id};
use feedstore::{Article, ContentStore, Freshness, ParsedFeed, Source};

const FEED_URL: &str = "https://example.com/feed";

fn article_strategy() -> impl Strategy<Value = Article> {
    ("[a-z0-9]{1,12}", proptest::option::of("[a-z]{1,8}")).prop_map(|(external_id, slug)| {
        let article = Article::titled(format!("Item {}", external_id)).with_external_id(external_id);
        match slug {
            Some(slug) => article.with_link(format!("https://example.com/{}", slug)),
            None => article,
        }
    })
}

proptest! {
    #[test]
    fn source_ids_are_stable(path in "[a-z]{1,16}") {
        let url = format!("https://{}.example/feed", path);
        prop_assert_eq!(derive_source_id(&url).unwrap(), derive_source_id(&url).unwrap());
    }

    #[test]
    fn article_identity_is_stable(article in article_strategy()) {
        let source_id = derive_source_id(FEED_URL).unwrap();
        let first = derive_article_identity(&source_id, &article).unwrap();
        let second = derive_article_identity(&source_id, &article.clone()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn repeated_refresh_never_marks_new(articles in proptest::collection::vec(article_strategy(), 0..12)) {
        tokio_test::block_on(async {
            let store = ContentStore::new(MemoryBackend::new());
            let source = store.add_source(Source::new(FEED_URL, "Example")).await.unwrap();
            let feed = ParsedFeed::new(Source::new(FEED_URL, "Example"), articles);

            store.refresh_feed(&source.id, &feed).await.unwrap();
            let summary = store.refresh_feed(&source.id, &feed).await.unwrap();

            assert_eq!(summary.added, 0);
            assert_eq!(summary.stale, 0);
            for article in store.get_all_articles().await.unwrap() {
                assert_eq!(article.freshness, Freshness::Current);
            }
        });
    }
}
