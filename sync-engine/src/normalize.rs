use chrono::{DateTime, Utc};
use sync_core::{
    Comment, CommentRecord, CoreError, ErrorReporter, GalleryResolver, NormalizedRecord,
    SavedItem, Submission, SubmissionRecord,
};
use tracing::{debug, warn};

pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

pub fn web_link(permalink: &str) -> String {
    format!("{}{}", REDDIT_WEB_BASE, permalink)
}

/// Formats epoch seconds (UTC) as `YYYY/MM/DD`.
pub fn format_created(created_utc: f64) -> Result<String, CoreError> {
    let out_of_range = || CoreError::InvalidInput {
        message: format!("creation timestamp {} is out of range", created_utc),
    };

    if !created_utc.is_finite() {
        return Err(out_of_range());
    }

    DateTime::<Utc>::from_timestamp(created_utc.floor() as i64, 0)
        .map(|date| date.format("%Y/%m/%d").to_string())
        .ok_or_else(out_of_range)
}

/// True when the URL path ends with a known image extension.
pub fn is_image_url(raw: &str) -> bool {
    let path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };

    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

pub fn is_gallery_url(raw: &str) -> bool {
    raw.contains("/gallery/")
}

pub async fn normalize(
    item: &SavedItem,
    resolver: &dyn GalleryResolver,
) -> Result<NormalizedRecord, CoreError> {
    match item {
        SavedItem::Submission(submission) => normalize_submission(submission, resolver)
            .await
            .map(NormalizedRecord::Submission),
        SavedItem::Comment(comment) => normalize_comment(comment).map(NormalizedRecord::Comment),
    }
}

async fn normalize_submission(
    submission: &Submission,
    resolver: &dyn GalleryResolver,
) -> Result<SubmissionRecord, CoreError> {
    let link = web_link(&submission.permalink);
    let mut has_img = false;
    let mut has_gallery = false;
    let mut img = None;

    if is_image_url(&submission.url) {
        has_img = true;
        img = Some(submission.url.clone());
    } else if is_gallery_url(&submission.url) {
        has_gallery = true;
        match resolver.resolve_gallery_image(&link).await {
            Ok(image) => {
                debug!("Resolved gallery image for {}", submission.id);
                img = Some(image);
            }
            Err(e) => {
                warn!("Could not resolve gallery image for {}", submission.id);
                ErrorReporter::new().report_warning(&e);
            }
        }
    }

    Ok(SubmissionRecord {
        post_id: submission.id.clone(),
        link,
        title: submission.title.clone(),
        subreddit: submission.subreddit.clone(),
        text: submission.selftext.clone(),
        is_video: submission.is_video,
        has_gallery,
        has_img,
        img,
        author: submission.author.clone(),
        flair: submission.link_flair_text.clone(),
        created: format_created(submission.created_utc)?,
        score: submission.score,
        total_awards_received: submission.total_awards_received,
        num_comments: submission.num_comments,
        upvote_ratio: submission.upvote_ratio,
        shortlink: submission.shortlink.clone(),
    })
}

fn normalize_comment(comment: &Comment) -> Result<CommentRecord, CoreError> {
    Ok(CommentRecord {
        post_id: comment.id.clone(),
        link: web_link(&comment.permalink),
        body: comment.body.clone(),
        author: comment.author.clone(),
        subreddit: comment.subreddit.clone(),
        created: format_created(comment.created_utc)?,
        score: comment.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{comment, submission, FakeResolver};

    #[test]
    fn test_created_is_utc_date() {
        assert_eq!(format_created(1609459200.0).unwrap(), "2021/01/01");
        assert_eq!(format_created(1609459199.9).unwrap(), "2020/12/31");
    }

    #[test]
    fn test_out_of_range_timestamp_is_invalid_input() {
        assert!(matches!(
            format_created(f64::NAN),
            Err(CoreError::InvalidInput { .. })
        ));
        assert!(matches!(
            format_created(1e20),
            Err(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_image_detection_uses_path_suffix() {
        assert!(is_image_url("https://i.redd.it/abc.jpg"));
        assert!(is_image_url("https://i.imgur.com/abc.PNG?width=640"));
        assert!(!is_image_url("https://example.com/jpg-guide/"));
        assert!(!is_image_url("https://example.com/a.gifv"));
        assert!(!is_image_url("https://www.reddit.com/gallery/abc"));
    }

    #[tokio::test]
    async fn test_image_submission() {
        let resolver = FakeResolver::failing();
        let record = normalize(
            &submission("abc", "https://i.redd.it/abc.jpg"),
            &resolver,
        )
        .await
        .unwrap();

        match record {
            NormalizedRecord::Submission(record) => {
                assert!(record.has_img);
                assert!(!record.has_gallery);
                assert_eq!(record.img.as_deref(), Some("https://i.redd.it/abc.jpg"));
                assert_eq!(
                    record.link,
                    "https://www.reddit.com/r/pics/comments/abc/title/"
                );
                assert_eq!(record.shortlink, "https://redd.it/abc");
            }
            NormalizedRecord::Comment(_) => panic!("Expected a submission"),
        }
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_gallery_submission_is_resolved_from_link() {
        let resolver = FakeResolver::returning("https://preview.redd.it/first.jpg");
        let record = normalize(
            &submission("gal", "https://www.reddit.com/gallery/gal"),
            &resolver,
        )
        .await
        .unwrap();

        match record {
            NormalizedRecord::Submission(record) => {
                assert!(record.has_gallery);
                assert!(!record.has_img);
                assert_eq!(
                    record.img.as_deref(),
                    Some("https://preview.redd.it/first.jpg")
                );
            }
            NormalizedRecord::Comment(_) => panic!("Expected a submission"),
        }
        assert_eq!(
            resolver.requested(),
            vec!["https://www.reddit.com/r/pics/comments/gal/title/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_gallery_failure_leaves_image_absent() {
        let resolver = FakeResolver::failing();
        let record = normalize(
            &submission("gal", "https://www.reddit.com/gallery/gal"),
            &resolver,
        )
        .await
        .unwrap();

        match record {
            NormalizedRecord::Submission(record) => {
                assert!(record.has_gallery);
                assert_eq!(record.img, None);
            }
            NormalizedRecord::Comment(_) => panic!("Expected a submission"),
        }
    }

    #[tokio::test]
    async fn test_comment_keeps_body_and_absent_author() {
        let resolver = FakeResolver::failing();
        let long_body = "x".repeat(5000);
        let mut item = comment("c1");
        if let SavedItem::Comment(comment) = &mut item {
            comment.body = long_body.clone();
            comment.author = None;
        }

        let record = normalize(&item, &resolver).await.unwrap();
        assert_eq!(record.body_text(), long_body);
        assert_eq!(record.author(), None);
        assert_eq!(record.kind(), sync_core::RecordKind::Comment);
    }
}
