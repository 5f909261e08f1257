//! Console selection prompts. Invalid answers re-prompt; closed input is an error.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use batch_downloader::{Concurrency, ManifestSource};
use batch_types::GroupSelection;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").context("write prompt")?;
        self.output.flush().context("flush prompt")?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("read answer")?;
        if read == 0 {
            bail!("input closed while waiting for an answer");
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}").context("write prompt")
    }

    pub fn source(&mut self) -> Result<ManifestSource> {
        self.say("Choose input method:")?;
        self.say("1. Google Sheets URL")?;
        self.say("2. Local CSV file")?;
        let choice = loop {
            match self.ask("Enter your choice (1 or 2): ")?.as_str() {
                "1" => break 1,
                "2" => break 2,
                _ => self.say("Please enter 1 or 2.")?,
            }
        };
        if choice == 1 {
            let url = self.ask("Enter the Google Sheets URL or direct CSV URL: ")?;
            Ok(ManifestSource::Url(url))
        } else {
            let path = self.ask("Enter the path to your CSV file: ")?;
            Ok(ManifestSource::File(
                batch_downloader::manifest::strip_quotes(&path).into(),
            ))
        }
    }

    pub fn concurrency(&mut self) -> Result<Concurrency> {
        self.say("Enter the number of simultaneous downloads (1-10, recommended: 4-6):")?;
        loop {
            let answer = self.ask("Number of simultaneous downloads: ")?;
            match answer.parse::<Concurrency>() {
                Ok(limit) => return Ok(limit),
                Err(_) => self.say("Please enter a number between 1 and 10.")?,
            }
        }
    }

    pub fn group(&mut self, groups: &[String]) -> Result<GroupSelection> {
        self.say("Available groups:")?;
        for (idx, group) in groups.iter().enumerate() {
            self.say(&format!("{}. {group}", idx + 1))?;
        }
        self.say("0. All groups")?;
        loop {
            let answer = self.ask("Enter the number of the group to download (0 for all): ")?;
            match answer.parse::<usize>() {
                Ok(0) => return Ok(GroupSelection::All),
                Ok(n) if n <= groups.len() => return Ok(GroupSelection::One(groups[n - 1].clone())),
                _ => self.say(&format!("Please enter a number between 0 and {}.", groups.len()))?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use super::*;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn source_reprompts_until_valid_choice() {
        let mut p = prompter("x\n3\n2\n\"/tmp/a b.csv\"\n");
        assert_eq!(
            p.source().unwrap(),
            ManifestSource::File(PathBuf::from("/tmp/a b.csv"))
        );
        let shown = String::from_utf8(p.output).unwrap();
        assert_eq!(shown.matches("Please enter 1 or 2.").count(), 2);
    }

    #[test]
    fn source_url_is_taken_verbatim() {
        let mut p = prompter("1\nhttps://docs.google.com/spreadsheets/d/x/edit\n");
        assert_eq!(
            p.source().unwrap(),
            ManifestSource::Url("https://docs.google.com/spreadsheets/d/x/edit".to_string())
        );
    }

    #[test]
    fn concurrency_rejects_out_of_range() {
        let mut p = prompter("0\n11\nfour\n 6 \n");
        assert_eq!(p.concurrency().unwrap().get(), 6);
    }

    #[test]
    fn group_zero_means_all() {
        let groups = vec!["Era A".to_string(), "Era B".to_string()];
        assert_eq!(prompter("0\n").group(&groups).unwrap(), GroupSelection::All);
        assert_eq!(
            prompter("5\n2\n").group(&groups).unwrap(),
            GroupSelection::One("Era B".to_string())
        );
    }

    #[test]
    fn closed_input_is_an_error() {
        let groups = vec!["Era A".to_string()];
        assert!(prompter("9\n").group(&groups).is_err());
        assert!(prompter("").concurrency().is_err());
    }
}
