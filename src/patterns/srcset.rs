use std::ops::Range;

/// One entry of a responsive candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// URL text.
    pub url: &'a str,
    /// Descriptor text following the URL, trimmed. Empty when absent.
    pub descriptor: &'a str,
    /// Byte range of the entry (URL through descriptor) within the list.
    pub span: Range<usize>,
}

impl Candidate<'_> {
    /// Well-formed entries are exactly a URL followed by one descriptor token.
    pub fn is_well_formed(&self) -> bool {
        !self.descriptor.is_empty() && self.descriptor.split_whitespace().count() == 1
    }
}

/// Split a `srcset`-style value into its candidates, in order.
///
/// URLs run until whitespace, so commas inside a URL survive; a URL that ends in commas has
/// no descriptor. Descriptors run until the next comma.
pub fn match_responsive_list(value: &str) -> Vec<Candidate<'_>> {
    let bytes = value.as_bytes();
    let mut candidates = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b',') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let url_start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let mut url_end = pos;

        if value[url_start..url_end].ends_with(',') {
            while url_end > url_start && bytes[url_end - 1] == b',' {
                url_end -= 1;
            }
            candidates.push(Candidate {
                url: &value[url_start..url_end],
                descriptor: "",
                span: url_start..url_end,
            });
            continue;
        }

        let descriptor_start = pos;
        while pos < bytes.len() && bytes[pos] != b',' {
            pos += 1;
        }
        let descriptor = value[descriptor_start..pos].trim();
        let end = if descriptor.is_empty() {
            url_end
        } else {
            descriptor_start + value[descriptor_start..pos].trim_end().len()
        };

        candidates.push(Candidate {
            url: &value[url_start..url_end],
            descriptor,
            span: url_start..end,
        });
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_urls_and_descriptors() {
        let list = "https://ex.com/a-300x200.jpg 300w, https://ex.com/a.jpg 1024w";
        let candidates = match_responsive_list(list);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "https://ex.com/a-300x200.jpg");
        assert_eq!(candidates[0].descriptor, "300w");
        assert_eq!(&list[candidates[0].span.clone()], "https://ex.com/a-300x200.jpg 300w");
        assert_eq!(candidates[1].descriptor, "1024w");
    }

    #[test]
    fn keeps_commas_inside_urls() {
        let list = "/img/a,b.jpg 1x,/img/c.jpg 2x";
        let candidates = match_responsive_list(list);

        assert_eq!(candidates[0].url, "/img/a,b.jpg");
        assert_eq!(candidates[1].url, "/img/c.jpg");
        assert_eq!(candidates[1].descriptor, "2x");
    }

    #[test]
    fn reports_missing_and_extra_descriptors() {
        let candidates = match_responsive_list("/a.jpg, /b.jpg 100w 2x, /c.jpg 3x");

        assert_eq!(candidates[0].url, "/a.jpg");
        assert!(!candidates[0].is_well_formed());
        assert_eq!(candidates[1].descriptor, "100w 2x");
        assert!(!candidates[1].is_well_formed());
        assert!(candidates[2].is_well_formed());
    }

    #[test]
    fn empty_lists_have_no_candidates() {
        assert!(match_responsive_list("").is_empty());
        assert!(match_responsive_list(" , ").is_empty());
    }
}
