use serde::Serialize;

/// 分页请求，`page` 从 0 开始。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// 分页大小策略：缺省值与上限。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

impl PagePolicy {
    pub fn new(default_size: u32, max_size: u32) -> Self {
        let max_size = max_size.max(1);
        Self {
            default_size: default_size.clamp(1, max_size),
            max_size,
        }
    }

    /// 把客户端传入的分页参数规整到合法范围
    pub fn resolve(&self, page: Option<u32>, size: Option<u32>) -> PageRequest {
        let size = size.unwrap_or(self.default_size).clamp(1, self.max_size);
        PageRequest::new(page.unwrap_or(0), size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let has_next = request.offset() + (items.len() as u64) < total_items;
        Self {
            items,
            page: request.page,
            size: request.size,
            total_items,
            has_next,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            has_next: self.has_next,
        }
    }
}
