use super::model::{Collection, Item, RequestItem};

impl Collection {
    /// Remove every request whose name equals `name`, ignoring case
    pub fn remove_endpoint_by_name(&mut self, name: &str) -> usize {
        let wanted = name.to_lowercase();
        let removed = self.remove_requests_where(|item| {
            item.name.as_deref().unwrap_or("").to_lowercase() == wanted
        });
        log::info!("Removed {} endpoints named '{}'", removed, name);
        removed
    }

    pub fn remove_endpoints_by_method(&mut self, method: &str) -> usize {
        let wanted = method.to_uppercase();
        let removed = self.remove_requests_where(|item| {
            item.request.method.as_deref().unwrap_or("").to_uppercase() == wanted
        });
        log::info!("Removed {} {} endpoints", removed, wanted);
        removed
    }

    /// Remove requests whose URL contains `pattern`, ignoring case. An empty
    /// pattern removes nothing.
    pub fn remove_endpoints_by_url_pattern(&mut self, pattern: &str) -> usize {
        if pattern.is_empty() {
            return 0;
        }
        let wanted = pattern.to_lowercase();
        let removed = self.remove_requests_where(|item| {
            item.request.resolved_url().to_lowercase().contains(&wanted)
        });
        log::info!("Removed {} endpoints matching '{}'", removed, pattern);
        removed
    }

    /// By-name removal for each name in turn; every name rescans the tree
    pub fn remove_multiple_endpoints<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        names
            .iter()
            .map(|name| self.remove_endpoint_by_name(name.as_ref()))
            .sum()
    }

    fn remove_requests_where<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(&RequestItem) -> bool,
    {
        let mut removed = 0;
        let items = std::mem::take(&mut self.item);
        self.item = prune(items, &predicate, &mut removed);
        removed
    }
}

/// Rebuild a child list without the matching requests, recursing into
/// folders. Folders themselves are never removed.
fn prune<P>(items: Vec<Item>, predicate: &P, removed: &mut usize) -> Vec<Item>
where
    P: Fn(&RequestItem) -> bool,
{
    items
        .into_iter()
        .filter_map(|item| match item {
            Item::Request(request) if predicate(&request) => {
                log::debug!("Endpoint removed: {}", request.display_name());
                *removed += 1;
                None
            }
            Item::Folder(mut folder) => {
                folder.item = prune(std::mem::take(&mut folder.item), predicate, removed);
                Some(Item::Folder(folder))
            }
            other => Some(other),
        })
        .collect()
}
