//! # ABI
//!
//! Only the slice of each contract the backend calls. Names follow the Solidity side so the
//! selectors line up, which is why the generated structs use camelCase fields.
//!
//! Event layouts for `MemeSubmitted` and `EngagementRequestSent` only matter for topic 1, the
//! id we pull out of receipts.
use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct ContestInfo {
        uint256 id;
        uint256 startTime;
        uint256 endTime;
        bool ended;
        uint256[] memeIds;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct WinnerInfo {
        address winner;
        uint96 totalStaked;
        uint64 contestId;
        uint64 memeId;
        uint64 timestamp;
        string originalMemeHash;
    }

    interface IMemeStaking {
        event MemeSubmitted(uint256 indexed memeId, address indexed creator, string ipfsHash);

        function memes(uint256 memeId) external view returns (uint256 id, address creator, uint256 totalStaked, uint256 timestamp, string ipfsHash, bool exists, bool rewardDistributed, uint256 engagementScore, string tweetId);
        function nextMemeId() external view returns (uint256);
        function currentContestId() external view returns (uint256);
        function minStakeAmount() external view returns (uint256);
        function contestDuration() external view returns (uint256);

        function getCurrentContest() external view returns (ContestInfo memory contest);
        function getContestWinner(uint256 contestId) external view returns (uint256);
        function getUserMemes(address user) external view returns (uint256[] memory);
        function getUserStake(uint256 memeId, address user) external view returns (uint256);
        function getUserStakedMemes(address user) external view returns (uint256[] memory);
        function getMemeStakers(uint256 memeId) external view returns (address[] memory);
        function isMemeStakeable(uint256 memeId) external view returns (bool);
        function getMemeStakeableTime(uint256 memeId) external view returns (uint256);
        function hasUserSubmittedInCurrentContest(address user) external view returns (bool);
        function hasUserSubmittedInContest(uint256 contestId, address user) external view returns (bool);

        function submitMeme(string calldata ipfsHash, string calldata tweetId) external;
        function stakeMeme(uint256 memeId) external payable;
        function withdrawStake(uint256 memeId) external;
        function endContest() external;
        function distributeRewardsBatch(uint256 memeId) external;
        function updateEngagementScore(uint256 memeId, uint256 score) external;
        function setMinStakeAmount(uint256 amount) external;
        function setContestDuration(uint256 duration) external;
    }

    interface IMemeNFT {
        event WinnerNFTMinted(uint256 indexed tokenId, uint64 contestId, uint64 memeId, address winner, uint256 totalStaked);
        event EmergencyMint(uint256 indexed tokenId, address winner, string reason);

        function mintWinnerNFT(address winner, uint64 contestId, uint64 memeId, string calldata originalMemeHash, uint256 totalStaked) external returns (uint256);
        function emergencyMint(address winner, uint64 contestId, uint64 memeId, string calldata originalMemeHash, uint256 totalStaked, string calldata reason) external returns (uint256);
        function getWinnerInfo(uint256 tokenId) external view returns (WinnerInfo memory info);
        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
        function tokenURI(uint256 tokenId) external view returns (string memory);
        function totalSupply() external view returns (uint256);
        function hasNFT(uint64 memeId) external view returns (bool);
        function getTokenForContest(uint64 contestId) external view returns (uint256);
    }

    interface ITwitterEngagement {
        event EngagementRequestSent(bytes32 indexed requestId, uint256 indexed memeId, string tweetId);

        function requestEngagementMetrics(uint256 memeId, string calldata tweetId) external returns (bytes32 requestId);
        function latestRequestId() external view returns (bytes32);
        function requestIdToMemeId(bytes32 requestId) external view returns (uint256);
    }
}
