use crate::job::JobSpec;
use crate::post::PostSnapshot;

/// Decomposes one post edition into independently moderated job specs: one
/// per non-blank title, content body, tag name, and image URL. Pure; order
/// of the result is insignificant.
pub fn build_jobs(post: &PostSnapshot) -> Vec<JobSpec> {
    let mut specs = Vec::new();

    if !post.title.trim().is_empty() {
        specs.push(JobSpec::text("title", post.title.clone()));
    }

    if !post.content.trim().is_empty() {
        specs.push(JobSpec::text("content", post.content.clone()));
    }

    for tag in &post.tags {
        if !tag.trim().is_empty() {
            specs.push(JobSpec::text(format!("tag:{tag}"), tag.clone()));
        }
    }

    for image in &post.images {
        if !image.url.trim().is_empty() {
            specs.push(JobSpec::image(format!("image:{}", image.id), image.url.clone()));
        }
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobContentType;
    use crate::post::PostImage;

    fn snapshot() -> PostSnapshot {
        PostSnapshot {
            post_id: "post-1".to_string(),
            version: 1,
            title: String::new(),
            content: String::new(),
            tags: vec![],
            images: vec![],
        }
    }

    #[test]
    fn title_and_content_each_become_one_text_job() {
        let post = PostSnapshot {
            title: "hello".to_string(),
            content: "world text".to_string(),
            ..snapshot()
        };
        let specs = build_jobs(&post);
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().any(|spec| spec.source_field == "title"));
        assert!(specs.iter().any(|spec| spec.source_field == "content"));
        assert!(specs.iter().all(|spec| spec.content_type == JobContentType::Text));
    }

    #[test]
    fn blank_fields_produce_no_jobs() {
        let post = PostSnapshot {
            title: "   ".to_string(),
            content: "\n\t".to_string(),
            tags: vec![String::new(), "  ".to_string()],
            images: vec![PostImage {
                id: "img-1".to_string(),
                url: "  ".to_string(),
            }],
            ..snapshot()
        };
        assert!(build_jobs(&post).is_empty());
    }

    #[test]
    fn tags_are_labeled_by_name() {
        let post = PostSnapshot {
            tags: vec!["rust".to_string(), "forum".to_string()],
            ..snapshot()
        };
        let specs = build_jobs(&post);
        let fields: Vec<&str> = specs.iter().map(|spec| spec.source_field.as_str()).collect();
        assert_eq!(fields, ["tag:rust", "tag:forum"]);
        assert_eq!(specs[0].payload, "rust");
    }

    #[test]
    fn images_are_labeled_by_id_and_typed_image() {
        let post = PostSnapshot {
            images: vec![PostImage {
                id: "img-7".to_string(),
                url: "http://files/img-7".to_string(),
            }],
            ..snapshot()
        };
        let specs = build_jobs(&post);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].source_field, "image:img-7");
        assert_eq!(specs[0].content_type, JobContentType::Image);
        assert_eq!(specs[0].payload, "http://files/img-7");
    }
}
