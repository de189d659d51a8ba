//! `q...`: the general-query subcommand family. Only the handful a minimal
//! host needs to complete its attach handshake are answered; everything
//! else gets the empty reply a debugger treats as "unsupported".

use super::ReplyBuilder;

pub(super) fn handle(args: &[u8], reply: &mut ReplyBuilder) {
    match args {
        b"C" => reply.push_bytes(b"QC0"),
        b"Attached" => reply.push_bytes(b"1"),
        b"fThreadInfo" => reply.push_bytes(b"m0"),
        b"sThreadInfo" => reply.push_bytes(b"l"),
        b"Symbol::" => reply.push_bytes(b"OK"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_thread_query() {
        let mut reply = ReplyBuilder::new();
        handle(b"C", &mut reply);
        assert_eq!(reply.as_slice(), b"QC0");
    }

    #[test]
    fn attached_query() {
        let mut reply = ReplyBuilder::new();
        handle(b"Attached", &mut reply);
        assert_eq!(reply.as_slice(), b"1");
    }

    #[test]
    fn thread_list_is_a_single_fixed_thread() {
        let mut first = ReplyBuilder::new();
        handle(b"fThreadInfo", &mut first);
        assert_eq!(first.as_slice(), b"m0");

        let mut rest = ReplyBuilder::new();
        handle(b"sThreadInfo", &mut rest);
        assert_eq!(rest.as_slice(), b"l");
    }

    #[test]
    fn unknown_subquery_is_empty() {
        let mut reply = ReplyBuilder::new();
        handle(b"Xyzzy", &mut reply);
        assert_eq!(reply.as_slice(), b"");
    }
}
