//! 私信访问策略
//!
//! 发送与查看权限都由关注关系推导。这里只包含纯函数，
//! 关注关系的查询由应用层完成后传入。

use crate::value_objects::UserId;

/// 关注关系在两个方向上的查询结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FollowEdges {
    /// 我是否关注了对方
    pub me_follows_counterpart: bool,
    /// 对方是否关注了我
    pub counterpart_follows_me: bool,
}

/// 发送权限：给自己发，或者我关注了对方。
pub fn send_allowed(me: UserId, counterpart: UserId, me_follows_counterpart: bool) -> bool {
    me == counterpart || me_follows_counterpart
}

/// 查看权限：任意一方关注另一方即可，比发送权限宽松。
pub fn view_allowed(me: UserId, counterpart: UserId, edges: FollowEdges) -> bool {
    me == counterpart || edges.me_follows_counterpart || edges.counterpart_follows_me
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ids() -> (UserId, UserId) {
        (UserId::from(Uuid::new_v4()), UserId::from(Uuid::new_v4()))
    }

    #[test]
    fn test_send_requires_following_the_receiver() {
        let (me, other) = ids();
        assert!(send_allowed(me, other, true));
        assert!(!send_allowed(me, other, false));
    }

    #[test]
    fn test_send_to_self_is_allowed() {
        let (me, _) = ids();
        assert!(send_allowed(me, me, false));
    }

    #[test]
    fn test_view_allowed_when_either_side_follows() {
        let (me, other) = ids();
        let none = FollowEdges::default();
        let outgoing = FollowEdges {
            me_follows_counterpart: true,
            counterpart_follows_me: false,
        };
        let incoming = FollowEdges {
            me_follows_counterpart: false,
            counterpart_follows_me: true,
        };

        assert!(!view_allowed(me, other, none));
        assert!(view_allowed(me, other, outgoing));
        assert!(view_allowed(me, other, incoming));
        assert!(view_allowed(me, me, none));
    }

    #[test]
    fn test_view_is_weaker_than_send() {
        let (me, other) = ids();
        // 对方关注我，但我没有关注对方：可查看，不可发送
        let edges = FollowEdges {
            me_follows_counterpart: false,
            counterpart_follows_me: true,
        };
        assert!(view_allowed(me, other, edges));
        assert!(!send_allowed(me, other, edges.me_follows_counterpart));
    }
}
